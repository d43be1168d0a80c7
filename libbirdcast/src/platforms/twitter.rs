//! Twitter/X platform client
//!
//! Talks to the v1.1 media upload endpoints and the v2 tweet endpoint with
//! OAuth 1.0a user-context signing. HTTP failures are mapped onto
//! [`PlatformError`] by status code:
//!
//! - 429 → `RateLimited`
//! - 5xx → `Server`
//! - 403 → `Forbidden`
//! - 401 → `Unauthorized`
//! - anything else → `Other`

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::TwitterConfig;
use crate::credentials::Credentials;
use crate::error::PlatformError;
use crate::platforms::oauth::OAuthSigner;
use crate::platforms::PlatformClient;
use crate::types::{AccountInfo, MediaHandle};

/// Size of each APPEND segment in a chunked upload
const CHUNK_SIZE: usize = 1024 * 1024;

/// Upper bound on STATUS polls while waiting for media processing
const MAX_STATUS_POLLS: u32 = 120;

/// Twitter API client
pub struct TwitterClient {
    http: reqwest::Client,
    signer: OAuthSigner,
    api_base: String,
    upload_base: String,
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
    #[serde(default)]
    processing_info: Option<ProcessingInfo>,
}

#[derive(Debug, Deserialize)]
struct ProcessingInfo {
    state: String,
    #[serde(default)]
    check_after_secs: Option<u64>,
    #[serde(default)]
    error: Option<ProcessingError>,
}

#[derive(Debug, Deserialize)]
struct ProcessingError {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia<'a>>,
}

#[derive(Debug, Serialize)]
struct TweetMedia<'a> {
    media_ids: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VerifyCredentialsResponse {
    id_str: String,
    screen_name: String,
    name: String,
    #[serde(default)]
    profile_image_url_https: Option<String>,
    #[serde(default)]
    followers_count: u64,
    #[serde(default)]
    friends_count: u64,
}

impl TwitterClient {
    /// Create a client for the given credentials
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Other` if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, config: &TwitterConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PlatformError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            signer: OAuthSigner::new(credentials),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/1.1/media/upload.json", self.upload_base)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Execute a request and turn non-success statuses into errors
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Other(format!("Twitter {} request failed: {}", context, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_http_error(status, &body))
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        context: &str,
    ) -> Result<Response, PlatformError> {
        let auth = self.signer.authorization_header("POST", url, params)?;
        let request = self.http.post(url).header(AUTHORIZATION, auth).form(params);
        self.send(request, context).await
    }

    async fn wait_for_processing(
        &self,
        media_id: &str,
        initial: Option<ProcessingInfo>,
    ) -> Result<(), PlatformError> {
        let url = self.upload_url();
        let mut info = initial;
        let mut polls = 0;

        while let Some(current) = info {
            match current.state.as_str() {
                "succeeded" => return Ok(()),
                "failed" => {
                    let reason = current
                        .error
                        .and_then(|e| e.message.or(e.name))
                        .unwrap_or_else(|| "unknown reason".to_string());
                    return Err(PlatformError::Other(format!(
                        "Media processing failed: {}",
                        reason
                    )));
                }
                _ => {}
            }

            if polls >= MAX_STATUS_POLLS {
                return Err(PlatformError::Other(format!(
                    "Media {} still processing after {} status checks",
                    media_id, MAX_STATUS_POLLS
                )));
            }
            polls += 1;

            let wait = current.check_after_secs.unwrap_or(1).max(1);
            debug!(
                "Media {} is {}; checking again in {}s",
                media_id, current.state, wait
            );
            sleep(Duration::from_secs(wait)).await;

            let params = [("command", "STATUS"), ("media_id", media_id)];
            let auth = self.signer.authorization_header("GET", &url, &params)?;
            let request = self
                .http
                .get(&url)
                .query(&params)
                .header(AUTHORIZATION, auth);
            let response = self.send(request, "media status").await?;
            let status: MediaUploadResponse = parse_json(response, "media status").await?;
            info = status.processing_info;
        }

        Ok(())
    }
}

#[async_trait]
impl PlatformClient for TwitterClient {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn verify_credentials(&self) -> Result<AccountInfo, PlatformError> {
        let url = self.api_url("1.1/account/verify_credentials.json");
        let auth = self.signer.authorization_header("GET", &url, &[])?;
        let request = self.http.get(&url).header(AUTHORIZATION, auth);

        let response = self.send(request, "verify credentials").await?;
        let user: VerifyCredentialsResponse = parse_json(response, "verify credentials").await?;

        Ok(AccountInfo {
            id: user.id_str,
            username: user.screen_name,
            name: user.name,
            profile_image: user.profile_image_url_https,
            followers_count: user.followers_count,
            following_count: user.friends_count,
        })
    }

    async fn upload_simple(&self, path: &Path) -> Result<MediaHandle, PlatformError> {
        info!("Uploading image: {}", path.display());

        let bytes = read_media(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media".to_string());
        let form = Form::new().part("media", Part::bytes(bytes).file_name(file_name));

        let url = self.upload_url();
        let auth = self.signer.authorization_header("POST", &url, &[])?;
        let request = self.http.post(&url).header(AUTHORIZATION, auth).multipart(form);

        let response = self.send(request, "media upload").await?;
        let uploaded: MediaUploadResponse = parse_json(response, "media upload").await?;

        info!("Image uploaded. Media ID: {}", uploaded.media_id_string);
        Ok(MediaHandle(uploaded.media_id_string))
    }

    async fn upload_chunked(
        &self,
        path: &Path,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaHandle, PlatformError> {
        let bytes = read_media(path).await?;
        let total_bytes = bytes.len().to_string();
        let url = self.upload_url();

        info!(
            "Chunked upload: {} ({} bytes, type {}, category {})",
            path.display(),
            bytes.len(),
            media_type,
            media_category
        );

        let init_params = [
            ("command", "INIT"),
            ("total_bytes", total_bytes.as_str()),
            ("media_type", media_type),
            ("media_category", media_category),
        ];
        let response = self.post_form(&url, &init_params, "media INIT").await?;
        let init: MediaUploadResponse = parse_json(response, "media INIT").await?;
        let media_id = init.media_id_string;

        for (index, chunk) in bytes.chunks(CHUNK_SIZE).enumerate() {
            let form = Form::new()
                .text("command", "APPEND")
                .text("media_id", media_id.clone())
                .text("segment_index", index.to_string())
                .part("media", Part::bytes(chunk.to_vec()));
            let auth = self.signer.authorization_header("POST", &url, &[])?;
            let request = self.http.post(&url).header(AUTHORIZATION, auth).multipart(form);
            self.send(request, "media APPEND").await?;
            debug!("Appended segment {} of media {}", index, media_id);
        }

        let finalize_params = [("command", "FINALIZE"), ("media_id", media_id.as_str())];
        let response = self.post_form(&url, &finalize_params, "media FINALIZE").await?;
        let finalized: MediaUploadResponse = parse_json(response, "media FINALIZE").await?;

        self.wait_for_processing(&media_id, finalized.processing_info)
            .await?;

        info!("Media uploaded. Media ID: {}", media_id);
        Ok(MediaHandle(media_id))
    }

    async fn create_post(
        &self,
        text: &str,
        media_ids: &[MediaHandle],
    ) -> Result<String, PlatformError> {
        let url = self.api_url("2/tweets");
        let body = CreateTweetRequest {
            text,
            media: (!media_ids.is_empty()).then(|| TweetMedia {
                media_ids: media_ids.iter().map(MediaHandle::as_str).collect(),
            }),
        };

        let auth = self.signer.authorization_header("POST", &url, &[])?;
        let request = self.http.post(&url).header(AUTHORIZATION, auth).json(&body);

        let response = self.send(request, "create tweet").await?;
        let created: CreateTweetResponse = parse_json(response, "create tweet").await?;
        Ok(created.data.id)
    }
}

async fn read_media(path: &Path) -> Result<Vec<u8>, PlatformError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| PlatformError::Other(format!("Failed to read {}: {}", path.display(), e)))
}

async fn parse_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T, PlatformError> {
    response
        .json::<T>()
        .await
        .map_err(|e| PlatformError::InvalidResponse(format!("Twitter {} response: {}", context, e)))
}

/// Map an unsuccessful HTTP response onto a platform error
fn map_http_error(status: StatusCode, body: &str) -> PlatformError {
    let detail = extract_error_detail(body).unwrap_or_else(|| body.trim().to_string());
    let message = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, detail)
    };

    match status.as_u16() {
        429 => PlatformError::RateLimited(message),
        500..=599 => PlatformError::Server(message),
        403 => PlatformError::Forbidden(message),
        401 => PlatformError::Unauthorized(message),
        _ => PlatformError::Other(message),
    }
}

/// Pull the human-readable message out of a Twitter error body
///
/// Handles both the v2 problem format (`detail`) and the v1.1 format
/// (`errors[].message`).
fn extract_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = value.get("detail").and_then(|d| d.as_str()) {
        return Some(detail.to_string());
    }

    let messages: Vec<String> = value
        .get("errors")?
        .as_array()?
        .iter()
        .filter_map(|error| {
            let message = error.get("message")?.as_str()?;
            match error.get("code").and_then(|c| c.as_i64()) {
                Some(code) => Some(format!("{} - {}", code, message)),
                None => Some(message.to_string()),
            }
        })
        .collect();

    (!messages.is_empty()).then(|| messages.join("; "))
}
