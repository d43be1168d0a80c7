//! Core data types for Birdcast

use serde::{Deserialize, Serialize};

/// Input to one publish attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Post text, not yet length-checked
    pub text: String,
    /// Remote URL, `file://` reference, or bare local path
    pub media: Option<String>,
}

impl PublishRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: impl Into<String>) -> Self {
        self.media = Some(media.into());
        self
    }
}

/// Opaque identifier the platform returns for uploaded media
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized outcome of a publish attempt
///
/// `success == false` means nothing was posted. A post that went out without
/// its media is still a success; `media_warning` says why the media was
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    pub post_id: Option<String>,
    pub post_url: Option<String>,
    pub error: Option<String>,
    pub char_count: usize,
    pub had_media: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_warning: Option<String>,
}

impl PublishResult {
    pub fn posted(post_id: String, char_count: usize, had_media: bool) -> Self {
        let post_url = Some(post_url_for(&post_id));
        Self {
            success: true,
            post_id: Some(post_id),
            post_url,
            error: None,
            char_count,
            had_media,
            media_warning: None,
        }
    }

    pub fn failed(error: impl Into<String>, char_count: usize) -> Self {
        Self {
            success: false,
            post_id: None,
            post_url: None,
            error: Some(error.into()),
            char_count,
            had_media: false,
            media_warning: None,
        }
    }

    pub fn with_media_warning(mut self, warning: Option<String>) -> Self {
        self.media_warning = warning;
        self
    }
}

/// Canonical web URL for a post id
pub fn post_url_for(post_id: &str) -> String {
    format!("https://twitter.com/i/web/status/{}", post_id)
}

/// Account details returned by a credential check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub followers_count: u64,
    pub following_count: u64,
}

/// Connection status exposed to health/status surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_keys: Option<Vec<String>>,
}

impl AccountStatus {
    pub fn connected(account: AccountInfo) -> Self {
        Self {
            connected: true,
            username: Some(account.username),
            user_id: Some(account.id),
            name: Some(account.name),
            profile_image: account.profile_image,
            followers_count: Some(account.followers_count),
            following_count: Some(account.following_count),
            ..Default::default()
        }
    }

    pub fn disconnected(error: impl Into<String>) -> Self {
        Self {
            connected: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
