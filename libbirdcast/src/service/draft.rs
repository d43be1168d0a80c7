//! Draft service for managing posts before and after publishing
//!
//! Drafts live in a process-local list (newest first) and are lost on
//! restart. Publishing a draft delegates to the [`Publisher`] and records the
//! outcome on the draft.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{BirdcastError, Result};
use crate::publisher::{Publisher, NOT_CONFIGURED_MESSAGE};
use crate::types::PublishResult;

/// Lifecycle of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Scheduled,
    Posted,
    Failed,
}

/// A stored post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: u64,
    pub content: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub platforms: Vec<String>,
    pub status: DraftStatus,
    pub scheduled_time: Option<String>,
    pub word_count: usize,
    pub char_count: usize,
    pub created_at: DateTime<Utc>,
    pub posted_time: Option<DateTime<Utc>>,
    pub tweet_id: Option<String>,
    pub tweet_url: Option<String>,
    pub error_message: Option<String>,
}

impl Draft {
    /// The media to publish with this draft (image takes precedence)
    pub fn media_reference(&self) -> Option<&str> {
        self.image_url.as_deref().or(self.video_url.as_deref())
    }

    fn apply_outcome(&mut self, result: &PublishResult) {
        if result.success {
            self.status = DraftStatus::Posted;
            self.posted_time = Some(Utc::now());
            self.tweet_id = result.post_id.clone();
            self.tweet_url = result.post_url.clone();
            self.error_message = None;
        } else {
            self.status = DraftStatus::Failed;
            self.error_message = result.error.clone();
        }
    }
}

/// Input for a new draft
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDraft {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub scheduled_time: Option<String>,
}

impl NewDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DraftStats {
    pub total: usize,
    pub posted: usize,
    pub failed: usize,
    pub scheduled: usize,
}

#[derive(Debug)]
struct DraftList {
    next_id: u64,
    drafts: Vec<Draft>,
}

/// In-memory draft list with monotonically increasing ids
#[derive(Debug)]
pub struct DraftStore {
    inner: RwLock<DraftList>,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DraftList {
                next_id: 1,
                drafts: Vec::new(),
            }),
        }
    }

    pub async fn create(&self, new: NewDraft) -> Draft {
        let mut list = self.inner.write().await;
        let status = if new.scheduled_time.is_some() {
            DraftStatus::Scheduled
        } else {
            DraftStatus::Draft
        };

        let draft = Draft {
            id: list.next_id,
            word_count: new.content.split_whitespace().count(),
            char_count: new.content.chars().count(),
            content: new.content,
            image_url: new.image_url,
            video_url: new.video_url,
            platforms: vec!["twitter".to_string()],
            status,
            scheduled_time: new.scheduled_time,
            created_at: Utc::now(),
            posted_time: None,
            tweet_id: None,
            tweet_url: None,
            error_message: None,
        };

        list.next_id += 1;
        list.drafts.insert(0, draft.clone());
        draft
    }

    /// All drafts, newest first
    pub async fn list(&self) -> Vec<Draft> {
        self.inner.read().await.drafts.clone()
    }

    pub async fn get(&self, id: u64) -> Option<Draft> {
        self.inner
            .read()
            .await
            .drafts
            .iter()
            .find(|draft| draft.id == id)
            .cloned()
    }

    /// Remove a draft, returning whether it existed
    pub async fn delete(&self, id: u64) -> bool {
        let mut list = self.inner.write().await;
        let before = list.drafts.len();
        list.drafts.retain(|draft| draft.id != id);
        list.drafts.len() != before
    }

    /// Record a publish outcome on an existing draft
    ///
    /// Returns `None` if the draft was deleted in the meantime.
    pub async fn record_outcome(&self, id: u64, result: &PublishResult) -> Option<Draft> {
        let mut list = self.inner.write().await;
        let draft = list.drafts.iter_mut().find(|draft| draft.id == id)?;
        draft.apply_outcome(result);
        Some(draft.clone())
    }

    /// Store a post that was published without a draft
    pub async fn record_direct(&self, content: &str, result: &PublishResult) -> Draft {
        let mut draft = self.create(NewDraft::new(content)).await;
        self.record_outcome(draft.id, result)
            .await
            .unwrap_or_else(|| {
                draft.apply_outcome(result);
                draft
            })
    }

    pub async fn stats(&self) -> DraftStats {
        let list = self.inner.read().await;
        let count = |status: DraftStatus| list.drafts.iter().filter(|d| d.status == status).count();

        DraftStats {
            total: list.drafts.len(),
            posted: count(DraftStatus::Posted),
            failed: count(DraftStatus::Failed),
            scheduled: count(DraftStatus::Scheduled),
        }
    }
}

/// Draft CRUD plus publishing through the publisher
#[derive(Clone)]
pub struct DraftService {
    store: Arc<DraftStore>,
    publisher: Arc<Publisher>,
}

impl DraftService {
    pub fn new(store: Arc<DraftStore>, publisher: Arc<Publisher>) -> Self {
        Self { store, publisher }
    }

    pub fn store(&self) -> &DraftStore {
        &self.store
    }

    pub async fn create(&self, new: NewDraft) -> Draft {
        let draft = self.store.create(new).await;
        info!(id = draft.id, status = ?draft.status, "Created draft");
        draft
    }

    pub async fn list(&self) -> Vec<Draft> {
        self.store.list().await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no draft has this id.
    pub async fn get(&self, id: u64) -> Result<Draft> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| BirdcastError::NotFound("Post not found".to_string()))
    }

    /// Delete a draft; deleting a missing id is not an error
    pub async fn delete(&self, id: u64) -> bool {
        let existed = self.store.delete(id).await;
        if existed {
            info!(id, "Deleted draft");
        }
        existed
    }

    /// Publish a stored draft and record the outcome on it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the draft does not exist
    /// - `InvalidInput` if it has already been posted
    /// - `NotConfigured` if no platform credentials are available
    ///
    /// A failed publish is not an error; it is recorded on the draft.
    pub async fn publish(&self, id: u64) -> Result<(Draft, PublishResult)> {
        let draft = self.get(id).await?;

        if draft.status == DraftStatus::Posted {
            return Err(BirdcastError::InvalidInput(
                "Post already published".to_string(),
            ));
        }

        if !self.publisher.is_configured() {
            return Err(BirdcastError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()));
        }

        let result = self
            .publisher
            .post(&draft.content, draft.media_reference())
            .await;

        let updated = match self.store.record_outcome(id, &result).await {
            Some(updated) => updated,
            None => {
                let mut detached = draft;
                detached.apply_outcome(&result);
                detached
            }
        };

        info!(id, success = result.success, "Published draft");
        Ok((updated, result))
    }

    /// Publish without a draft, then store the post with its outcome
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` if no platform credentials are available.
    pub async fn publish_direct(
        &self,
        content: &str,
        media: Option<&str>,
    ) -> Result<(Draft, PublishResult)> {
        if !self.publisher.is_configured() {
            return Err(BirdcastError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()));
        }

        let result = self.publisher.post(content, media).await;
        let draft = self.store.record_direct(content, &result).await;
        Ok((draft, result))
    }

    pub async fn stats(&self) -> DraftStats {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::media::MediaResolver;
    use crate::platforms::mock::MockClient;
    use std::time::Duration;

    fn service_with(client: Option<MockClient>) -> DraftService {
        let resolver = MediaResolver::new(Duration::from_secs(5)).unwrap();
        let client = client.map(|c| Arc::new(c) as Arc<dyn crate::platforms::PlatformClient>);
        let publisher = Publisher::new(client, resolver);
        DraftService::new(Arc::new(DraftStore::new()), Arc::new(publisher))
    }

    #[tokio::test]
    async fn test_create_draft() {
        let service = service_with(None);
        let draft = service.create(NewDraft::new("Hello  brave new world")).await;

        assert_eq!(draft.id, 1);
        assert_eq!(draft.status, DraftStatus::Draft);
        assert_eq!(draft.word_count, 4);
        assert_eq!(draft.char_count, 22);
        assert_eq!(draft.platforms, vec!["twitter".to_string()]);
        assert!(draft.tweet_id.is_none());
    }

    #[tokio::test]
    async fn test_scheduled_draft() {
        let service = service_with(None);
        let draft = service
            .create(NewDraft {
                scheduled_time: Some("2026-01-01T09:00:00Z".to_string()),
                ..NewDraft::new("later")
            })
            .await;
        assert_eq!(draft.status, DraftStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_increasing_ids() {
        let service = service_with(None);
        service.create(NewDraft::new("one")).await;
        service.create(NewDraft::new("two")).await;
        service.create(NewDraft::new("three")).await;

        let ids: Vec<u64> = service.list().await.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let service = service_with(None);
        let first = service.create(NewDraft::new("one")).await;
        assert!(service.delete(first.id).await);
        assert!(!service.delete(first.id).await);

        let second = service.create(NewDraft::new("two")).await;
        assert_eq!(second.id, 2);
        assert_eq!(service.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let service = service_with(None);
        let err = service.get(99).await.unwrap_err();
        assert!(matches!(err, BirdcastError::NotFound(msg) if msg == "Post not found"));
    }

    #[test]
    fn test_media_reference_prefers_image() {
        let mut draft = Draft {
            id: 1,
            content: String::new(),
            image_url: Some("a.png".to_string()),
            video_url: Some("b.mp4".to_string()),
            platforms: vec![],
            status: DraftStatus::Draft,
            scheduled_time: None,
            word_count: 0,
            char_count: 0,
            created_at: Utc::now(),
            posted_time: None,
            tweet_id: None,
            tweet_url: None,
            error_message: None,
        };
        assert_eq!(draft.media_reference(), Some("a.png"));
        draft.image_url = None;
        assert_eq!(draft.media_reference(), Some("b.mp4"));
    }

    #[tokio::test]
    async fn test_publish_success_records_tweet() {
        let client = MockClient::success();
        let service = service_with(Some(client.clone()));
        let draft = service.create(NewDraft::new("ship it")).await;

        let (updated, result) = service.publish(draft.id).await.unwrap();

        assert!(result.success);
        assert_eq!(updated.status, DraftStatus::Posted);
        assert_eq!(updated.tweet_id, result.post_id);
        assert_eq!(updated.tweet_url, result.post_url);
        assert!(updated.posted_time.is_some());
        assert_eq!(service.get(draft.id).await.unwrap(), updated);
        assert_eq!(client.posted_texts(), vec!["ship it".to_string()]);
    }

    #[tokio::test]
    async fn test_publish_twice_rejected() {
        let service = service_with(Some(MockClient::success()));
        let draft = service.create(NewDraft::new("once")).await;
        service.publish(draft.id).await.unwrap();

        let err = service.publish(draft.id).await.unwrap_err();
        assert!(matches!(err, BirdcastError::InvalidInput(msg) if msg == "Post already published"));
    }

    #[tokio::test]
    async fn test_publish_failure_records_error() {
        let client = MockClient::post_failure(PlatformError::Unauthorized("401".to_string()));
        let service = service_with(Some(client));
        let draft = service.create(NewDraft::new("nope")).await;

        let (updated, result) = service.publish(draft.id).await.unwrap();
        assert!(!result.success);
        assert_eq!(updated.status, DraftStatus::Failed);
        assert_eq!(updated.error_message, result.error);

        // a failed draft may be retried
        assert!(service.publish(draft.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_not_configured() {
        let service = service_with(None);
        let draft = service.create(NewDraft::new("hi")).await;

        let err = service.publish(draft.id).await.unwrap_err();
        assert!(matches!(err, BirdcastError::NotConfigured(_)));
        assert_eq!(service.get(draft.id).await.unwrap().status, DraftStatus::Draft);
    }

    #[tokio::test]
    async fn test_publish_missing_draft() {
        let service = service_with(Some(MockClient::success()));
        assert!(matches!(
            service.publish(42).await,
            Err(BirdcastError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_direct_records_post() {
        let service = service_with(Some(MockClient::success()));
        let (draft, result) = service.publish_direct("direct", None).await.unwrap();

        assert!(result.success);
        assert_eq!(draft.status, DraftStatus::Posted);
        assert_eq!(service.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let client = MockClient::with_post_outcomes(vec![
            Ok("1".to_string()),
            Err(PlatformError::Forbidden("no".to_string())),
        ]);
        let service = service_with(Some(client));

        service.publish_direct("ok", None).await.unwrap();
        service.publish_direct("bad", None).await.unwrap();
        service
            .create(NewDraft {
                scheduled_time: Some("tomorrow".to_string()),
                ..NewDraft::new("later")
            })
            .await;
        service.create(NewDraft::new("plain")).await;

        assert_eq!(
            service.stats().await,
            DraftStats {
                total: 4,
                posted: 1,
                failed: 1,
                scheduled: 1,
            }
        );
    }
}
