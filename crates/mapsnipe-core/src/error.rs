//! Error types for mapsnipe-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mapsnipe operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not get data from {address}: {message}")]
    FeedUnavailable { address: String, message: String },

    #[error("Feed format is not valid: {0}")]
    FeedFormat(String),

    #[error("Failed to parse sighting: {0}")]
    SightingParse(String),

    #[error("Unknown species id: {0}")]
    UnknownSpecies(u32),

    #[error("Failed to read species table {path}: {message}")]
    SpeciesTable { path: PathBuf, message: String },

    #[error("Host service error ({service}): {message}")]
    Service {
        service: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled before relocation")]
    Cancelled,
}

impl Error {
    /// Shorthand for a failure reported by one of the host collaborators
    pub fn service(service: &'static str, message: impl Into<String>) -> Self {
        Self::Service {
            service,
            message: message.into(),
        }
    }
}

/// Result type alias for mapsnipe operations
pub type Result<T> = std::result::Result<T, Error>;
