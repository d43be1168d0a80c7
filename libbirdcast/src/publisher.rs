//! Publish pipeline
//!
//! [`Publisher::post`] takes text and an optional media reference and always
//! returns a [`PublishResult`]; failures are reported through the result,
//! never as an `Err`. Media problems are soft: the post goes out text-only and
//! `media_warning` says why. Only the platform post call is retried.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::credentials::{Credentials, REQUIRED_KEYS};
use crate::error::{PlatformError, Result};
use crate::media::{ChunkedMediaType, MediaKind, MediaResolver, ResolvedMedia};
use crate::platforms::twitter::TwitterClient;
use crate::platforms::PlatformClient;
use crate::retry::{classify_platform_error, with_retry, RetryError, RetryPolicy};
use crate::types::{AccountStatus, MediaHandle, PublishRequest, PublishResult};

pub const NOT_CONFIGURED_MESSAGE: &str =
    "Twitter not configured. Add API credentials to .env file.";
pub const CREDENTIALS_NOT_CONFIGURED_MESSAGE: &str = "Twitter credentials not configured";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials - check your API keys";
pub const DUPLICATE_MESSAGE: &str = "Duplicate content - this tweet was already posted";
pub const FORBIDDEN_MESSAGE: &str = "Access forbidden - check your app permissions";
pub const UNAUTHORIZED_MESSAGE: &str = "Authentication failed - check your API credentials";

/// Default maximum post length, in characters
pub const MAX_TEXT_LENGTH: usize = 280;

const ELLIPSIS: &str = "...";

/// Publishes posts to the platform
///
/// A publisher without a client is "not configured": every publish fails
/// fast without touching the network.
pub struct Publisher {
    client: Option<Arc<dyn PlatformClient>>,
    resolver: MediaResolver,
    retry: RetryPolicy,
    max_text_length: usize,
}

impl Publisher {
    pub fn new(client: Option<Arc<dyn PlatformClient>>, resolver: MediaResolver) -> Self {
        Self {
            client,
            resolver,
            retry: RetryPolicy::default(),
            max_text_length: MAX_TEXT_LENGTH,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    /// Build a publisher from configuration
    ///
    /// Missing credentials are not an error; the publisher is simply not
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut resolver = MediaResolver::new(config.media.download_timeout())?;
        if let Some(dir) = config.media.expand_temp_dir() {
            resolver = resolver.with_temp_dir(dir);
        }

        let client: Option<Arc<dyn PlatformClient>> = match Credentials::resolve(&config.twitter) {
            Ok(credentials) => Some(Arc::new(TwitterClient::new(credentials, &config.twitter)?)),
            Err(missing) => {
                warn!("Twitter credentials incomplete, publishing disabled ({})", missing);
                None
            }
        };

        Ok(Self::new(client, resolver)
            .with_retry_policy(RetryPolicy::try_from(&config.retry)?)
            .with_max_text_length(config.media.max_text_length))
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Check the credentials against the platform
    pub async fn get_status(&self) -> AccountStatus {
        let Some(client) = &self.client else {
            return AccountStatus {
                required_keys: Some(REQUIRED_KEYS.iter().map(|key| key.to_string()).collect()),
                ..AccountStatus::disconnected(CREDENTIALS_NOT_CONFIGURED_MESSAGE)
            };
        };

        match client.verify_credentials().await {
            Ok(account) => {
                debug!("Credentials valid for @{}", account.username);
                AccountStatus::connected(account)
            }
            Err(PlatformError::Unauthorized(msg)) => {
                warn!("Credential check rejected: {}", msg);
                AccountStatus::disconnected(INVALID_CREDENTIALS_MESSAGE)
            }
            Err(e) => {
                warn!("Credential check failed: {}", e);
                AccountStatus::disconnected(e.to_string())
            }
        }
    }

    pub async fn publish(&self, request: &PublishRequest) -> PublishResult {
        self.post(&request.text, request.media.as_deref()).await
    }

    /// Publish `text` with optional media
    ///
    /// Each call creates a new post on the platform.
    pub async fn post(&self, text: &str, media_ref: Option<&str>) -> PublishResult {
        let text = truncate_text(text, self.max_text_length);
        let char_count = text.chars().count();

        let Some(client) = &self.client else {
            warn!("Publish requested but Twitter is not configured");
            return PublishResult::failed(NOT_CONFIGURED_MESSAGE, char_count);
        };

        let mut media_warning = None;

        let resolved = match media_ref {
            Some(reference) => match self.resolver.resolve(reference).await {
                Ok(media) => Some(media),
                Err(e) => {
                    warn!("Media resolution failed, posting text only: {}", e);
                    media_warning = Some(format!("Media could not be loaded: {}", e));
                    None
                }
            },
            None => None,
        };

        let mut media_ids = Vec::new();
        if let Some(media) = &resolved {
            match upload_media(client.as_ref(), media).await {
                Ok(handle) => media_ids.push(handle),
                Err(warning) => {
                    warn!("{}; posting text only", warning);
                    media_warning = Some(warning);
                }
            }
        }
        let had_media = !media_ids.is_empty();

        let outcome = {
            let client = client.as_ref();
            let text = text.as_str();
            let media_ids = media_ids.as_slice();
            with_retry(&self.retry, classify_platform_error, move |attempt| {
                debug!(attempt = attempt + 1, had_media, "Creating post");
                client.create_post(text, media_ids)
            })
            .await
        };

        if let Some(media) = resolved {
            media.cleanup();
        }

        match outcome {
            Ok(post_id) => {
                info!("Posted to {}: {}", client.name(), post_id);
                PublishResult::posted(post_id, char_count, had_media).with_media_warning(media_warning)
            }
            Err(e) => {
                let message = failure_message(&e);
                error!("Publish failed: {}", message);
                PublishResult {
                    had_media,
                    ..PublishResult::failed(message, char_count)
                }
                .with_media_warning(media_warning)
            }
        }
    }
}

/// Upload resolved media, returning a warning message on failure
async fn upload_media(
    client: &dyn PlatformClient,
    media: &ResolvedMedia,
) -> std::result::Result<MediaHandle, String> {
    let path = media.local_path();

    let uploaded = match media.kind() {
        MediaKind::Unsupported => {
            return Err(format!("Unsupported media type: {}", path.display()));
        }
        kind if kind.requires_chunked_upload() => {
            let media_type = ChunkedMediaType::for_path(path);
            client
                .upload_chunked(path, media_type.media_type, media_type.category)
                .await
        }
        _ => client.upload_simple(path).await,
    };

    uploaded.map_err(|e| format!("Media upload failed: {}", e))
}

/// Map a failed post onto the message reported to the caller
fn failure_message(error: &RetryError<PlatformError>) -> String {
    match error {
        RetryError::Terminal(e) | RetryError::Exhausted { last: e, .. } => match e {
            PlatformError::Forbidden(msg) if msg.to_lowercase().contains("duplicate") => {
                DUPLICATE_MESSAGE.to_string()
            }
            PlatformError::Forbidden(_) => FORBIDDEN_MESSAGE.to_string(),
            PlatformError::Unauthorized(_) => UNAUTHORIZED_MESSAGE.to_string(),
            other => other.to_string(),
        },
        RetryError::Unknown => error.to_string(),
    }
}

/// Truncate to `max_chars` characters, ending with "..." when shortened
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    if max_chars < ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }

    let keep = max_chars - ELLIPSIS.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
