//! Client library generation handling.
//!
//! The two supported generations of the client library differ in how a
//! client is constructed and in the API version a fresh client starts on.
//! [`SdkCompat`] decides the generation once and hides both differences.

use std::{fmt, sync::Arc};

use bonsai_common::internal;

use crate::{
    client::{ClientFactory, ProviderClient},
    error::{MailgunError, Result},
};

/// API version every request must go through.
pub const REQUIRED_API_VERSION: &str = "v3";

/// Major generation of the client library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkGeneration {
    V1,
    V2,
}

impl SdkGeneration {
    /// Detect the generation from a library version string.
    ///
    /// Only the first character is considered.
    ///
    /// # Errors
    ///
    /// [`MailgunError::UnsupportedSdkVersion`] for anything but `1` or `2`.
    pub fn detect(version: &str) -> Result<Self> {
        match version.chars().next() {
            Some('1') => Ok(Self::V1),
            Some('2') => Ok(Self::V2),
            _ => Err(MailgunError::UnsupportedSdkVersion(version.to_string())),
        }
    }

    #[must_use]
    pub const fn major(self) -> &'static str {
        match self {
            Self::V1 => "1",
            Self::V2 => "2",
        }
    }
}

impl fmt::Display for SdkGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.major())
    }
}

/// Builds correctly configured clients for the detected generation.
#[derive(Clone)]
pub struct SdkCompat {
    factory: Arc<dyn ClientFactory>,
    api_key: String,
    generation: SdkGeneration,
}

impl fmt::Debug for SdkCompat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkCompat")
            .field("factory", &self.factory)
            .field("api_key", &"<redacted>")
            .field("generation", &self.generation)
            .finish()
    }
}

impl SdkCompat {
    /// # Errors
    ///
    /// [`MailgunError::UnsupportedSdkVersion`] if the factory reports a
    /// generation other than 1 or 2.
    pub fn new(factory: Arc<dyn ClientFactory>, api_key: impl Into<String>) -> Result<Self> {
        let generation = SdkGeneration::detect(factory.sdk_version())?;
        internal!(
            level = DEBUG,
            sdk_version = factory.sdk_version(),
            %generation,
            "Detected client library generation"
        );

        Ok(Self {
            factory,
            api_key: api_key.into(),
            generation,
        })
    }

    #[must_use]
    pub const fn generation(&self) -> SdkGeneration {
        self.generation
    }

    /// Major version of the client library, `"1"` or `"2"`.
    #[must_use]
    pub const fn sdk_major_version(&self) -> &'static str {
        self.generation.major()
    }

    /// Put an externally built client on the required API version.
    ///
    /// Generation 2 clients start on `v2`; generation 1 clients are left alone.
    pub fn normalize_client(&self, client: &mut dyn ProviderClient) {
        if self.generation == SdkGeneration::V2 {
            client.set_api_version(REQUIRED_API_VERSION);
        }
    }

    /// A client for `host` on `api_version`.
    #[must_use]
    pub fn build_client_for(&self, host: &str, api_version: &str) -> Box<dyn ProviderClient> {
        match self.generation {
            SdkGeneration::V1 => self.factory.connect_v1(&self.api_key, host, api_version),
            SdkGeneration::V2 => {
                let mut client = self.factory.connect_v2(&self.api_key, host);
                client.set_api_version(api_version);
                client
            }
        }
    }

    /// The listing client for `host`.
    #[must_use]
    pub fn client_for_host(&self, host: &str) -> Box<dyn ProviderClient> {
        let mut client = match self.generation {
            SdkGeneration::V1 => {
                self.factory
                    .connect_v1(&self.api_key, host, REQUIRED_API_VERSION)
            }
            SdkGeneration::V2 => self.factory.connect_v2(&self.api_key, host),
        };
        self.normalize_client(client.as_mut());
        client
    }
}
