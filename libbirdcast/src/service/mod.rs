//! Service layer for Birdcast
//!
//! Business logic shared by the CLI and the HTTP API. `BirdcastService` is
//! the entry point; it owns the publisher and the draft service.
//!
//! # Example
//!
//! ```no_run
//! use libbirdcast::service::BirdcastService;
//! use libbirdcast::service::draft::NewDraft;
//!
//! # async fn example() -> libbirdcast::Result<()> {
//! let service = BirdcastService::new()?;
//!
//! let draft = service.draft().create(NewDraft::new("Hello from Birdcast")).await;
//! let (draft, result) = service.draft().publish(draft.id).await?;
//! println!("{:?}: {:?}", draft.status, result.post_url);
//! # Ok(())
//! # }
//! ```

pub mod draft;

use std::sync::Arc;

use self::draft::{DraftService, DraftStore};
use crate::publisher::Publisher;
use crate::{Config, Result};

/// Main service facade
///
/// Sub-services share the same `Arc<Publisher>`.
pub struct BirdcastService {
    config: Arc<Config>,
    publisher: Arc<Publisher>,
    draft: DraftService,
}

impl BirdcastService {
    /// Create a service from the default configuration file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the HTTP
    /// clients cannot be built.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config)
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let publisher = Publisher::from_config(&config)?;
        Ok(Self::with_publisher(config, publisher))
    }

    /// Build a service around an existing publisher
    pub fn with_publisher(config: Config, publisher: Publisher) -> Self {
        let publisher = Arc::new(publisher);
        let draft = DraftService::new(Arc::new(DraftStore::new()), Arc::clone(&publisher));

        Self {
            config: Arc::new(config),
            publisher,
            draft,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn draft(&self) -> &DraftService {
        &self.draft
    }
}
