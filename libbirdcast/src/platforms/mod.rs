//! Platform client abstraction
//!
//! The publisher talks to the platform through [`PlatformClient`]. There is a
//! single real implementation, [`twitter::TwitterClient`]; [`mock::MockClient`]
//! is a scripted stand-in for tests.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use libbirdcast::credentials::Credentials;
//! use libbirdcast::config::TwitterConfig;
//! use libbirdcast::platforms::{PlatformClient, twitter::TwitterClient};
//!
//! # async fn example() -> Result<(), libbirdcast::error::PlatformError> {
//! let credentials = Credentials::new("key", "secret", "token", "token-secret");
//! let client = TwitterClient::new(credentials, &TwitterConfig::default())?;
//!
//! let account = client.verify_credentials().await?;
//! println!("Connected as @{}", account.username);
//!
//! let media = client.upload_simple(Path::new("photo.png")).await?;
//! let post_id = client.create_post("Hello!", &[media]).await?;
//! println!("Posted: {}", post_id);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::{AccountInfo, MediaHandle};

pub mod mock;
pub mod oauth;
pub mod twitter;

/// Operations the publisher needs from the platform
///
/// Errors must use the [`PlatformError`] variant that matches the failure so
/// the publisher can decide whether to retry.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Lowercase platform identifier (e.g. "twitter")
    fn name(&self) -> &str;

    /// Check the credentials and return the account they belong to
    async fn verify_credentials(&self) -> Result<AccountInfo, PlatformError>;

    /// Upload an image in a single request
    async fn upload_simple(&self, path: &Path) -> Result<MediaHandle, PlatformError>;

    /// Upload video or animated media in chunks
    ///
    /// Returns only once the platform has finished any asynchronous
    /// processing of the upload.
    async fn upload_chunked(
        &self,
        path: &Path,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaHandle, PlatformError>;

    /// Create a post and return its platform id
    async fn create_post(
        &self,
        text: &str,
        media_ids: &[MediaHandle],
    ) -> Result<String, PlatformError>;
}
