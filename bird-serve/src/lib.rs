//! bird-serve - HTTP dashboard API for Birdcast
//!
//! Exposes draft management, publishing, uploads and account status over
//! JSON. See [`build_app`] for the route table.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use libbirdcast::service::BirdcastService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes;

/// Multipart bodies may carry a full-size video plus form overhead
const BODY_LIMIT: usize = routes::MAX_VIDEO_BYTES + 1024 * 1024;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BirdcastService>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(service: Arc<BirdcastService>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            service,
            upload_dir: upload_dir.into(),
        }
    }
}

/// Build the application router
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/api/twitter/status", get(routes::twitter_status))
        .route("/api/twitter/test", post(routes::twitter_test))
        .route("/api/posts", get(routes::list_posts).post(routes::create_post))
        .route("/api/posts/:id", delete(routes::delete_post))
        .route("/api/posts/:id/publish", post(routes::publish_post))
        .route("/api/upload", post(routes::upload_media))
        .route("/api/publish-direct", post(routes::publish_direct))
        .route("/api/stats", get(routes::stats))
        .route("/api/platforms/status", get(routes::platforms_status))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
