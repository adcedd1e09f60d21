//! Shared plumbing for the bonsai crates: log setup and the log macros used
//! around provider traffic.

pub mod logging;

pub use tracing;
