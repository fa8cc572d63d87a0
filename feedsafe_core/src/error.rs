//! Error types for the feedsafe_core library.
//!
//! The calculation modules never fail; these errors come from the I/O
//! layers (config, plan store, drink log) and from CLI input parsing.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for feedsafe_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// User supplied value that could not be interpreted
    #[error("Invalid input: {0}")]
    Input(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
