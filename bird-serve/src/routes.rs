//! Route handlers

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use chrono::Utc;
use libbirdcast::service::draft::NewDraft;
use libbirdcast::AccountStatus;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: usize = 512 * 1024 * 1024;

const TEST_NOT_CONFIGURED_MESSAGE: &str = "Twitter not configured. Add credentials to .env file.";

const UPLOAD_EXTENSIONS: [(&str, &str); 6] = [
    ("image/jpeg", ".jpg"),
    ("image/png", ".png"),
    ("image/gif", ".gif"),
    ("image/webp", ".webp"),
    ("video/mp4", ".mp4"),
    ("video/quicktime", ".mov"),
];

pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "Birdcast API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "twitter_configured": state.service.publisher().is_configured(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn twitter_status(State(state): State<AppState>) -> Json<AccountStatus> {
    Json(state.service.publisher().get_status().await)
}

pub async fn twitter_test(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let publisher = state.service.publisher();
    if !publisher.is_configured() {
        return Err(ApiError::bad_request(TEST_NOT_CONFIGURED_MESSAGE));
    }

    let status = publisher.get_status().await;
    if !status.connected {
        return Err(ApiError::unauthorized(format!(
            "Twitter authentication failed: {}",
            status.error.as_deref().unwrap_or("unknown error")
        )));
    }

    let username = status.username.unwrap_or_default();
    Ok(Json(json!({
        "success": true,
        "message": format!("Connected as @{}", username),
        "username": username,
        "user_id": status.user_id,
    })))
}

pub async fn list_posts(State(state): State<AppState>) -> Json<Value> {
    let posts = state.service.draft().list().await;
    Json(json!({ "total": posts.len(), "posts": posts }))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(new): Json<NewDraft>,
) -> Json<Value> {
    let post = state.service.draft().create(new).await;
    Json(json!({ "success": true, "post": post }))
}

pub async fn delete_post(State(state): State<AppState>, UrlPath(id): UrlPath<u64>) -> Json<Value> {
    state.service.draft().delete(id).await;
    Json(json!({ "success": true }))
}

pub async fn publish_post(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<u64>,
) -> ApiResult<Json<Value>> {
    let (post, result) = state.service.draft().publish(id).await?;
    Ok(Json(json!({
        "success": result.success,
        "post": post,
        "twitter_result": result,
    })))
}

/// A file received through a multipart form
struct ReceivedFile {
    file_name: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

impl ReceivedFile {
    fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }

    fn is_media(&self) -> bool {
        self.content_type.starts_with("image/") || self.is_video()
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_path: String,
    pub file_name: String,
    pub file_size: usize,
    pub content_type: String,
    pub is_video: bool,
}

pub async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            file = Some(read_file(field).await?);
        }
    }
    let file = file.ok_or_else(|| ApiError::bad_request("Missing file field"))?;

    if !file.is_media() {
        return Err(ApiError::bad_request(format!(
            "Invalid file type: {}. Use image or video files.",
            file.content_type
        )));
    }

    let (limit, label) = if file.is_video() {
        (MAX_VIDEO_BYTES, "512MB")
    } else {
        (MAX_IMAGE_BYTES, "5MB")
    };
    if file.bytes.len() > limit {
        return Err(ApiError::bad_request(format!("File too large. Max: {}", label)));
    }

    let path = save_file(&state.upload_dir, "upload", &file).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!("Stored upload {} ({} bytes)", file_name, file.bytes.len());

    Ok(Json(UploadResponse {
        success: true,
        file_path: path.display().to_string(),
        file_name,
        file_size: file.bytes.len(),
        is_video: file.is_video(),
        content_type: file.content_type,
    }))
}

pub async fn publish_direct(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    if !state.service.publisher().is_configured() {
        return Err(ApiError::bad_request(
            libbirdcast::publisher::NOT_CONFIGURED_MESSAGE,
        ));
    }

    let mut content = None;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("content") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid content: {}", e)))?;
                content = Some(text);
            }
            Some("file") => {
                let received = read_file(field).await?;
                // browsers send an empty part when no file was chosen
                if !received.bytes.is_empty() {
                    file = Some(received);
                }
            }
            _ => {}
        }
    }

    let content = content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("content is required"))?;

    let media_path = match &file {
        Some(file) if !file.is_media() => return Err(ApiError::bad_request("Invalid file type")),
        Some(file) => Some(save_file(&state.upload_dir, "direct", file).await?),
        None => None,
    };

    let media = media_path.as_deref().and_then(Path::to_str);
    let (post, result) = state.service.draft().publish_direct(&content, media).await?;

    Ok(Json(json!({
        "success": result.success,
        "post": post,
        "twitter_result": result,
    })))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    let stats = state.service.draft().stats().await;
    let connected = state.service.publisher().is_configured();
    let connected_platforms = usize::from(connected);

    Json(json!({
        "totalPosts": stats.total,
        "postedPosts": stats.posted,
        "failedPosts": stats.failed,
        "scheduledPosts": stats.scheduled,
        "connectedPlatforms": connected_platforms,
        "twitter_connected": connected,
    }))
}

/// Dashboard-compatible list of platform connections (a bare JSON array)
pub async fn platforms_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.service.publisher().get_status().await;

    Json(json!([{
        "id": 1,
        "platform": "twitter",
        "connected": status.connected,
        "account_name": status.username.clone().unwrap_or_default(),
        "username": status.username.as_ref().map(|name| format!("@{}", name)),
        "avatar_url": status.profile_image,
        "error": status.error,
    }]))
}

async fn read_file(field: axum::extract::multipart::Field<'_>) -> ApiResult<ReceivedFile> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().unwrap_or_default().to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

    Ok(ReceivedFile {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

/// Persist an uploaded file under `dir` with a unique, sanitized name
async fn save_file(dir: &Path, prefix: &str, file: &ReceivedFile) -> ApiResult<PathBuf> {
    let ext = upload_extension(&file.content_type);
    let stem = file
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).file_stem())
        .map(|stem| sanitize(&stem.to_string_lossy()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "media".to_string());

    let unique = uuid::Uuid::new_v4().simple().to_string();
    let file_name = format!(
        "{}_{}_{}_{}{}",
        prefix,
        Utc::now().format("%Y%m%d_%H%M%S"),
        &unique[..8],
        stem,
        ext
    );
    let path = dir.join(file_name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create upload dir: {}", e)))?;
    tokio::fs::write(&path, &file.bytes).await.map_err(|e| {
        warn!("Failed to store upload {}: {}", path.display(), e);
        ApiError::internal(format!("Failed to store upload: {}", e))
    })?;

    Ok(path)
}

fn upload_extension(content_type: &str) -> &'static str {
    UPLOAD_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
        .unwrap_or(".tmp")
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension("image/png"), ".png");
        assert_eq!(upload_extension("video/quicktime"), ".mov");
        assert_eq!(upload_extension("image/bmp"), ".tmp");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("my photo (1)"), "my_photo__1_");
        assert_eq!(sanitize("../../etc"), "______etc");
        assert_eq!(sanitize("clip-01_final"), "clip-01_final");
    }
}
