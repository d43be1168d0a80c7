//! Mock platform client for testing
//!
//! A scripted stand-in for [`TwitterClient`](super::twitter::TwitterClient).
//! Post outcomes are consumed in order from a queue; once the queue is empty
//! every post succeeds. Counters and captured arguments live behind `Arc`s,
//! so a clone kept by the test observes calls made through the publisher.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::platforms::PlatformClient;
use crate::types::{AccountInfo, MediaHandle};

/// One recorded upload call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub path: PathBuf,
    /// Whether the file existed when the upload was attempted
    pub existed: bool,
    pub chunked: bool,
    pub media_type: Option<String>,
    pub media_category: Option<String>,
}

/// Configuration for mock client behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// Account returned by `verify_credentials`; `None` makes it fail
    pub account: Option<AccountInfo>,

    /// Error returned by `verify_credentials` when `account` is `None`
    pub verify_error: PlatformError,

    /// Error returned by both upload paths
    pub upload_error: Option<PlatformError>,

    /// Outcomes for successive `create_post` calls
    pub post_outcomes: Arc<Mutex<VecDeque<Result<String, PlatformError>>>>,

    pub verify_call_count: Arc<Mutex<usize>>,
    pub upload_call_count: Arc<Mutex<usize>>,
    pub post_call_count: Arc<Mutex<usize>>,

    /// Text and media ids of every `create_post` call
    pub posted: Arc<Mutex<Vec<(String, Vec<MediaHandle>)>>>,

    pub uploads: Arc<Mutex<Vec<UploadRecord>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            account: Some(mock_account()),
            verify_error: PlatformError::Unauthorized("401 Unauthorized".to_string()),
            upload_error: None,
            post_outcomes: Arc::new(Mutex::new(VecDeque::new())),
            verify_call_count: Arc::new(Mutex::new(0)),
            upload_call_count: Arc::new(Mutex::new(0)),
            post_call_count: Arc::new(Mutex::new(0)),
            posted: Arc::new(Mutex::new(Vec::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// The account a default mock reports
pub fn mock_account() -> AccountInfo {
    AccountInfo {
        id: "1234567890".to_string(),
        username: "mock_user".to_string(),
        name: "Mock User".to_string(),
        profile_image: None,
        followers_count: 42,
        following_count: 7,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock platform client
#[derive(Debug, Clone)]
pub struct MockClient {
    config: MockConfig,
}

impl MockClient {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A client where every call succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// A client whose posts always fail with `error`
    pub fn post_failure(error: PlatformError) -> Self {
        let client = Self::success();
        // Enough scripted failures to outlast any retry policy used in tests
        client.push_post_outcomes((0..32).map(|_| Err(error.clone())));
        client
    }

    /// A client whose posts follow `outcomes`, then succeed
    pub fn with_post_outcomes(outcomes: Vec<Result<String, PlatformError>>) -> Self {
        let client = Self::success();
        client.push_post_outcomes(outcomes);
        client
    }

    /// A client whose uploads fail with `error`
    pub fn upload_failure(error: PlatformError) -> Self {
        Self::new(MockConfig {
            upload_error: Some(error),
            ..Default::default()
        })
    }

    /// A client whose credential check fails with `error`
    pub fn verify_failure(error: PlatformError) -> Self {
        Self::new(MockConfig {
            account: None,
            verify_error: error,
            ..Default::default()
        })
    }

    pub fn push_post_outcomes(
        &self,
        outcomes: impl IntoIterator<Item = Result<String, PlatformError>>,
    ) {
        lock(&self.config.post_outcomes).extend(outcomes);
    }

    pub fn verify_call_count(&self) -> usize {
        *lock(&self.config.verify_call_count)
    }

    pub fn upload_call_count(&self) -> usize {
        *lock(&self.config.upload_call_count)
    }

    pub fn post_call_count(&self) -> usize {
        *lock(&self.config.post_call_count)
    }

    /// Text of every post attempt, in order
    pub fn posted_texts(&self) -> Vec<String> {
        lock(&self.config.posted)
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    /// Media ids passed with every post attempt, in order
    pub fn posted_media(&self) -> Vec<Vec<MediaHandle>> {
        lock(&self.config.posted)
            .iter()
            .map(|(_, media)| media.clone())
            .collect()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        lock(&self.config.uploads).clone()
    }

    fn record_upload(
        &self,
        path: &Path,
        chunked: bool,
        media_type: Option<&str>,
        media_category: Option<&str>,
    ) -> Result<MediaHandle, PlatformError> {
        let count = {
            let mut count = lock(&self.config.upload_call_count);
            *count += 1;
            *count
        };

        lock(&self.config.uploads).push(UploadRecord {
            path: path.to_path_buf(),
            existed: path.exists(),
            chunked,
            media_type: media_type.map(str::to_string),
            media_category: media_category.map(str::to_string),
        });

        match &self.config.upload_error {
            Some(error) => Err(error.clone()),
            None => Ok(MediaHandle(format!("mock-media-{}", count))),
        }
    }
}

#[async_trait]
impl PlatformClient for MockClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn verify_credentials(&self) -> Result<AccountInfo, PlatformError> {
        *lock(&self.config.verify_call_count) += 1;

        match &self.config.account {
            Some(account) => Ok(account.clone()),
            None => Err(self.config.verify_error.clone()),
        }
    }

    async fn upload_simple(&self, path: &Path) -> Result<MediaHandle, PlatformError> {
        self.record_upload(path, false, None, None)
    }

    async fn upload_chunked(
        &self,
        path: &Path,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaHandle, PlatformError> {
        self.record_upload(path, true, Some(media_type), Some(media_category))
    }

    async fn create_post(
        &self,
        text: &str,
        media_ids: &[MediaHandle],
    ) -> Result<String, PlatformError> {
        let count = {
            let mut count = lock(&self.config.post_call_count);
            *count += 1;
            *count
        };

        lock(&self.config.posted).push((text.to_string(), media_ids.to_vec()));

        match lock(&self.config.post_outcomes).pop_front() {
            Some(outcome) => outcome,
            None => Ok(format!("{}", 1_000_000 + count)),
        }
    }
}
