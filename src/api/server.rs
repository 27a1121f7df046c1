use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::{generate_caption, health, index};
use crate::config::Config;
use crate::service::CaptionService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CaptionService>,
}

impl AppState {
    pub fn new(service: CaptionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn create_router(state: AppState, config: &Config) -> Router {
    let body_limit = match config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/generate", post(generate_caption))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // mirrors the request origin so credentialed requests are allowed
                .layer(CorsLayer::very_permissive())
                .layer(body_limit),
        )
        .with_state(state)
}
