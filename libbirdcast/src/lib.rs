//! Birdcast - draft and publish posts to Twitter/X
//!
//! This library holds the publish pipeline (media resolution, upload, post
//! with retry), the Twitter client, configuration and the in-memory draft
//! service used by the `bird-post` and `bird-serve` binaries.

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod media;
pub mod platforms;
pub mod publisher;
pub mod retry;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{BirdcastError, Result};
pub use publisher::Publisher;
pub use types::{AccountStatus, MediaHandle, PublishRequest, PublishResult};
