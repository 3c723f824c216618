//! CLI error types.

use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine error.
    #[error("{0}")]
    Core(#[from] ajiaco_core::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON rendering error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested model isn't registered.
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    /// The storage has no stamp row.
    #[error("storage '{0}' is not stamped")]
    NotStamped(String),
}
