//! Error types for Birdcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BirdcastError>;

#[derive(Error, Debug)]
pub enum BirdcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Publish failed: {0}")]
    Publish(String),
}

impl BirdcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BirdcastError::InvalidInput(_) => 3,
            BirdcastError::NotConfigured(_) => 2,
            BirdcastError::Platform(PlatformError::Unauthorized(_)) => 2,
            BirdcastError::Platform(_) => 1,
            BirdcastError::Config(_) => 1,
            BirdcastError::Media(_) => 1,
            BirdcastError::NotFound(_) => 1,
            BirdcastError::Publish(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Failures reported by the platform client.
///
/// The variant decides how the publisher reacts: rate limits and server
/// errors are retried with backoff, `Other` is retried with standard
/// backoff, and the remaining variants are terminal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Other(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// The raw message carried by the error, without the category prefix
    pub fn message(&self) -> &str {
        match self {
            PlatformError::RateLimited(msg)
            | PlatformError::Server(msg)
            | PlatformError::Forbidden(msg)
            | PlatformError::Unauthorized(msg)
            | PlatformError::Other(msg)
            | PlatformError::InvalidResponse(msg) => msg,
        }
    }
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
