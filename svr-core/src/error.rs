/*!
Error types for the svr core engine.
*/

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the svr core.
pub type Result<T> = std::result::Result<T, SvrError>;

/// Errors that can occur during bundle and remote-store operations.
#[derive(Error, Debug)]
pub enum SvrError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file missing from the project directory
    #[error("configuration file not found at {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Configuration record is present but a required field is missing or empty
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Remote connection settings are incomplete
    #[error("remote configuration is incomplete: {0} is empty")]
    RemoteConfigIncomplete(String),

    /// Archive/compression failures while building or finalizing a bundle
    #[error("compression error: {0}")]
    Compression(String),

    /// Upload to the object store failed
    #[error("upload error: {0}")]
    Upload(String),

    /// Download from the object store failed
    #[error("download error: {0}")]
    Download(String),

    /// Unpacking a downloaded bundle failed
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Listing or other object-store transport failures
    #[error("storage error: {0}")]
    Storage(String),

    /// The remote namespace holds no bundles for this project
    #[error("no remote bundles found for this project")]
    NoRemoteObjects,

    /// A remote key does not carry a parseable embedded timestamp
    #[error("malformed remote key (no embedded timestamp): {0}")]
    MalformedKey(String),
}

impl SvrError {
    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new upload error
    pub fn upload<S: Into<String>>(msg: S) -> Self {
        Self::Upload(msg.into())
    }

    /// Create a new download error
    pub fn download<S: Into<String>>(msg: S) -> Self {
        Self::Download(msg.into())
    }

    /// Create a new extraction error
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new invalid-configuration error
    pub fn config_invalid<S: Into<String>>(msg: S) -> Self {
        Self::ConfigInvalid(msg.into())
    }
}
