//! Media resolution
//!
//! Turns a media reference (remote URL, `file://` reference or bare local
//! path) into a local file that is guaranteed to exist for the duration of
//! one publish call. Downloaded files live in a uniquely named temporary
//! file owned by the returned [`ResolvedMedia`] and are deleted exactly once,
//! when it is cleaned up or dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::error::MediaError;

/// Prefix marking a reference as a local file
pub const LOCAL_FILE_PREFIX: &str = "file://";

/// Image extensions accepted for upload (including `.gif`)
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Video extensions accepted for upload
pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "mov"];

/// Content types we know how to persist, with the extension they map to
const CONTENT_TYPE_EXTENSIONS: [(&str, &str); 7] = [
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
];

/// How a media file gets uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Gif,
    Video,
    Unsupported,
}

impl MediaKind {
    /// Classify a file by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        if SUPPORTED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else if ext == "gif" {
            MediaKind::Gif
        } else if SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Image
        } else {
            MediaKind::Unsupported
        }
    }

    /// Whether this kind goes through the chunked upload path
    pub fn requires_chunked_upload(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Gif)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Gif => write!(f, "gif"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// MIME type and media category sent with a chunked upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedMediaType {
    pub media_type: &'static str,
    pub category: &'static str,
}

impl ChunkedMediaType {
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match ext.as_deref() {
            Some("mov") => Self {
                media_type: "video/quicktime",
                category: "tweet_video",
            },
            Some("gif") => Self {
                media_type: "image/gif",
                category: "tweet_gif",
            },
            // mp4 and anything unrecognized
            _ => Self {
                media_type: "video/mp4",
                category: "tweet_video",
            },
        }
    }
}

/// A local media file ready for upload
#[derive(Debug)]
pub struct ResolvedMedia {
    local_path: PathBuf,
    kind: MediaKind,
    temp: Option<TempPath>,
}

impl ResolvedMedia {
    fn local(path: PathBuf) -> Self {
        let kind = MediaKind::from_path(&path);
        Self {
            local_path: path,
            kind,
            temp: None,
        }
    }

    fn temporary(temp: TempPath) -> Self {
        let local_path = temp.to_path_buf();
        let kind = MediaKind::from_path(&local_path);
        Self {
            local_path,
            kind,
            temp: Some(temp),
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    /// Delete the backing file if it was downloaded
    ///
    /// Consumes the media so the deletion cannot happen twice. Local files
    /// supplied by the caller are never touched.
    pub fn cleanup(self) {
        if let Some(temp) = self.temp {
            match temp.close() {
                Ok(()) => debug!("Cleaned up: {}", self.local_path.display()),
                Err(e) => warn!(
                    "Cleanup warning for {}: {}",
                    self.local_path.display(),
                    e
                ),
            }
        }
    }
}

/// Resolves media references into local files
#[derive(Debug, Clone)]
pub struct MediaResolver {
    http: reqwest::Client,
    temp_dir: Option<PathBuf>,
}

impl MediaResolver {
    /// Create a resolver whose downloads time out after `download_timeout`
    pub fn new(download_timeout: Duration) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(download_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| MediaError::Download(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            temp_dir: None,
        })
    }

    /// Store downloaded files in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Resolve a media reference into a local file
    ///
    /// # Errors
    ///
    /// - `MediaError::NotFound` if a local reference does not exist
    /// - `MediaError::Download` if a remote reference cannot be fetched
    /// - `MediaError::Io` if the downloaded bytes cannot be persisted
    pub async fn resolve(&self, reference: &str) -> Result<ResolvedMedia, MediaError> {
        if let Some(path) = reference.strip_prefix(LOCAL_FILE_PREFIX) {
            info!("Using local file: {}", path);
            return Self::existing_local(path);
        }

        if is_remote(reference) {
            return self.download(reference).await;
        }

        Self::existing_local(reference)
    }

    fn existing_local(path: &str) -> Result<ResolvedMedia, MediaError> {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(MediaError::NotFound(path.display().to_string()));
        }
        Ok(ResolvedMedia::local(path))
    }

    async fn download(&self, url: &str) -> Result<ResolvedMedia, MediaError> {
        info!("Downloading media from: {}", truncate_for_log(url, 80));

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| MediaError::Download(e.to_string()))?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::Download(e.to_string()))?;

        let ext = extension_for_content_type(&content_type)
            .map(str::to_string)
            .or_else(|| extension_from_url(url))
            .unwrap_or_else(|| "jpg".to_string());

        let suffix = format!(".{}", ext);
        let mut builder = tempfile::Builder::new();
        builder.prefix("birdcast_").suffix(&suffix);
        let file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let temp = file.into_temp_path();
        tokio::fs::write(&temp, &bytes).await?;

        info!("Downloaded: {} ({} bytes)", temp.display(), bytes.len());

        Ok(ResolvedMedia::temporary(temp))
    }
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

fn truncate_for_log(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}

/// Map a `Content-Type` header value onto a supported extension
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.to_lowercase();
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(mime, _)| content_type.contains(mime))
        .map(|(_, ext)| *ext)
}

/// The URL's path suffix, when it names a supported media type
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_lowercase();

    let supported = SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .chain(SUPPORTED_VIDEO_EXTENSIONS.iter())
        .any(|known| *known == ext);

    supported.then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a fixed HTTP response to every connection, returning the base URL
    async fn serve(status: &'static str, content_type: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    content_type,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    fn resolver(dir: &TempDir) -> MediaResolver {
        MediaResolver::new(Duration::from_secs(5))
            .unwrap()
            .with_temp_dir(dir.path())
    }

    #[test]
    fn test_media_kind_classification() {
        assert_eq!(MediaKind::from_path(Path::new("a.mp4")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("a.MOV")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("a.gif")), MediaKind::Gif);
        assert_eq!(MediaKind::from_path(Path::new("a.jpeg")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("a.PNG")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("a.webp")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("a.pdf")), MediaKind::Unsupported);
        assert_eq!(MediaKind::from_path(Path::new("noext")), MediaKind::Unsupported);
    }

    #[test]
    fn test_chunked_upload_routing() {
        assert!(MediaKind::Video.requires_chunked_upload());
        assert!(MediaKind::Gif.requires_chunked_upload());
        assert!(!MediaKind::Image.requires_chunked_upload());
        assert!(!MediaKind::Unsupported.requires_chunked_upload());
    }

    #[test]
    fn test_chunked_media_type_by_extension() {
        let mp4 = ChunkedMediaType::for_path(Path::new("clip.mp4"));
        assert_eq!((mp4.media_type, mp4.category), ("video/mp4", "tweet_video"));

        let mov = ChunkedMediaType::for_path(Path::new("clip.MOV"));
        assert_eq!((mov.media_type, mov.category), ("video/quicktime", "tweet_video"));

        let gif = ChunkedMediaType::for_path(Path::new("loop.gif"));
        assert_eq!((gif.media_type, gif.category), ("image/gif", "tweet_gif"));

        let other = ChunkedMediaType::for_path(Path::new("clip.avi"));
        assert_eq!((other.media_type, other.category), ("video/mp4", "tweet_video"));
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_content_type("image/jpg"), Some("jpg"));
        assert_eq!(extension_for_content_type("image/png; charset=binary"), Some("png"));
        assert_eq!(extension_for_content_type("video/quicktime"), Some("mov"));
        assert_eq!(extension_for_content_type("application/octet-stream"), None);
        assert_eq!(extension_for_content_type(""), None);
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/a/clip.MP4?sig=abc"),
            Some("mp4".to_string())
        );
        assert_eq!(
            extension_from_url("https://cdn.example.com/photo.webp#frag"),
            Some("webp".to_string())
        );
        assert_eq!(extension_from_url("https://cdn.example.com/file.bin"), None);
        assert_eq!(extension_from_url("https://cdn.example.com/image"), None);
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 80), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
    }

    #[tokio::test]
    async fn test_resolve_file_prefix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"png").unwrap();

        let reference = format!("file://{}", path.display());
        let media = resolver(&dir).resolve(&reference).await.unwrap();

        assert_eq!(media.local_path(), path.as_path());
        assert_eq!(media.kind(), MediaKind::Image);
        assert!(!media.is_temporary());

        media.cleanup();
        assert!(path.exists(), "local files must never be deleted");
    }

    #[tokio::test]
    async fn test_resolve_bare_local_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"mp4").unwrap();

        let media = resolver(&dir)
            .resolve(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(media.kind(), MediaKind::Video);
        assert!(!media.is_temporary());
    }

    #[tokio::test]
    async fn test_resolve_missing_local_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.png");

        let err = resolver(&dir)
            .resolve(&format!("file://{}", missing.display()))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));

        let err = resolver(&dir)
            .resolve("not-a-url-or-a-file")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_download_uses_content_type() {
        let dir = TempDir::new().unwrap();
        let base = serve("200 OK", "image/png", b"\x89PNG fake").await;

        let media = resolver(&dir)
            .resolve(&format!("{}/download", base))
            .await
            .unwrap();

        assert!(media.is_temporary());
        assert_eq!(media.kind(), MediaKind::Image);
        let path = media.local_path().to_path_buf();
        assert_eq!(path.extension().unwrap(), "png");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("birdcast_"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG fake");

        media.cleanup();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_download_falls_back_to_url_suffix() {
        let dir = TempDir::new().unwrap();
        let base = serve("200 OK", "application/octet-stream", b"gif89a").await;

        let media = resolver(&dir)
            .resolve(&format!("{}/anim.gif?size=large", base))
            .await
            .unwrap();
        assert_eq!(media.kind(), MediaKind::Gif);
        assert_eq!(media.local_path().extension().unwrap(), "gif");
    }

    #[tokio::test]
    async fn test_download_defaults_to_jpeg() {
        let dir = TempDir::new().unwrap();
        let base = serve("200 OK", "application/octet-stream", b"bytes").await;

        let media = resolver(&dir)
            .resolve(&format!("{}/blob", base))
            .await
            .unwrap();
        assert_eq!(media.kind(), MediaKind::Image);
        assert_eq!(media.local_path().extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let dir = TempDir::new().unwrap();
        let base = serve("404 Not Found", "text/plain", b"nope").await;

        let err = resolver(&dir)
            .resolve(&format!("{}/img.png", base))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Download(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_unreachable_host() {
        let dir = TempDir::new().unwrap();
        let err = resolver(&dir)
            .resolve("http://127.0.0.1:1/img.png")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Download(_)));
    }

    #[tokio::test]
    async fn test_dropping_temporary_media_deletes_file() {
        let dir = TempDir::new().unwrap();
        let base = serve("200 OK", "video/mp4", b"mp4").await;

        let media = resolver(&dir)
            .resolve(&format!("{}/clip", base))
            .await
            .unwrap();
        let path = media.local_path().to_path_buf();
        assert!(path.exists());

        drop(media);
        assert!(!path.exists());
    }
}
