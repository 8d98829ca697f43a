pub mod health;
pub mod list;
pub mod upload;

use crate::db::Repository;
use crate::pipeline::MeasurePipeline;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Upload bodies carry a base64 image.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub pipeline: Arc<MeasurePipeline>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, pipeline: Arc<MeasurePipeline>) -> Self {
        Self { repo, pipeline }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/upload", post(upload::upload))
        .route("/:customer_code/list", get(list::list_measures))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}
