//! Error types for Frostvale

use thiserror::Error;

/// The main error type for Frostvale core operations
#[derive(Debug, Error)]
pub enum FrostError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Scene error: {0}")]
    SceneError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Render target '{target}' is incomplete: {reason}")]
    IncompleteTarget { target: String, reason: String },

    #[error("Frame plan error: {0}")]
    FramePlanError(String),
}

/// Result type alias for Frostvale core operations
pub type Result<T> = std::result::Result<T, FrostError>;

impl From<toml::de::Error> for FrostError {
    fn from(err: toml::de::Error) -> Self {
        FrostError::TomlParseError(err.to_string())
    }
}
