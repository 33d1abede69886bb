//! Crate error type for setup-level failures.
//!
//! Tool operations never surface these; they report through
//! [`InstallResult`](crate::pipeline::InstallResult) and
//! [`UninstallResult`](crate::pipeline::UninstallResult) instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("failed to start process runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
