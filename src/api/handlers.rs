use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Html,
    Json,
};

use crate::api::models::{CaptionResponse, HealthResponse};
use crate::api::server::AppState;
use crate::error::CaptionError;

/// Multipart field that carries the image.
pub const FILE_FIELD: &str = "file";

pub async fn generate_caption(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CaptionResponse>, CaptionError> {
    let start = Instant::now();
    let data = read_file_field(multipart?).await?;
    tracing::debug!(bytes = data.len(), "upload received");

    // decode and inference are CPU bound
    let service = state.service.clone();
    let caption = tokio::task::spawn_blocking(move || service.caption_bytes(&data))
        .await
        .map_err(CaptionError::inference)??;

    tracing::info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        caption = %caption,
        "caption generated"
    );

    Ok(Json(CaptionResponse { caption }))
}

/// Returns the first `file` field, skipping anything else in the form.
async fn read_file_field(mut multipart: Multipart) -> Result<Bytes, CaptionError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(CaptionError::MissingFile)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.service.model_id().to_string(),
    })
}

pub async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}
