use std::path::{Path, PathBuf};

use bonsai_mailgun::{EventQuery, MailgunConfig};
use serde::Deserialize;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "BONSAI_CONFIG";

const DEFAULT_PATHS: [&str; 2] = ["./bonsai.config.ron", "/etc/bonsai/bonsai.config.ron"];

/// Contents of `bonsai.config.ron`.
///
/// ```ron
/// (
///     mailgun: (api_key: "key-..."),
///     query: (domain: "mg.example.com", time_range_secs: Some(86400)),
/// )
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mailgun: MailgunConfig,

    /// Query used when the command line does not override it
    #[serde(default)]
    pub query: Option<EventQuery>,
}

impl Config {
    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or is not valid configuration.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config from {}: {e}", path.display()))?;

        ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config in {}: {e}", path.display()))
    }

    /// The configured default query, or an empty one.
    #[must_use]
    pub fn default_query(&self) -> EventQuery {
        self.query.clone().unwrap_or_else(|| EventQuery::new(""))
    }
}

/// Find the configuration file using the following precedence:
/// 1. `BONSAI_CONFIG` environment variable
/// 2. ./bonsai.config.ron (current working directory)
/// 3. /etc/bonsai/bonsai.config.ron (system-wide config)
///
/// # Errors
///
/// If `BONSAI_CONFIG` names a missing file, or no default file exists.
pub fn find_config_file() -> anyhow::Result<PathBuf> {
    let candidates = DEFAULT_PATHS.map(PathBuf::from);
    find_config_file_in(std::env::var(CONFIG_ENV).ok(), &candidates)
}

fn find_config_file_in(env_path: Option<String>, candidates: &[PathBuf]) -> anyhow::Result<PathBuf> {
    if let Some(env_path) = env_path {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("{CONFIG_ENV} points to non-existent file: {}", path.display());
    }

    if let Some(path) = candidates.iter().find(|path| path.exists()) {
        return Ok(path.clone());
    }

    let paths_tried = candidates
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}
