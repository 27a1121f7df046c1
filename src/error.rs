use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::api::models::ErrorResponse;

/// Per-request failures of the caption pipeline.
///
/// Model loading failures are not represented here: they happen before the
/// server accepts connections and abort startup.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("expected a multipart/form-data upload: {0}")]
    NotMultipart(#[from] MultipartRejection),

    #[error("multipart upload has no `file` field")]
    MissingFile,

    #[error("malformed multipart upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("uploaded bytes are not a decodable image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("caption generation failed: {0}")]
    Inference(String),
}

impl CaptionError {
    pub fn inference(err: impl std::fmt::Display) -> Self {
        Self::Inference(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CaptionError::MissingFile | CaptionError::Decode(_) => StatusCode::BAD_REQUEST,
            CaptionError::NotMultipart(rejection) => rejection.status(),
            CaptionError::Multipart(err) => err.status(),
            CaptionError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<candle_core::Error> for CaptionError {
    fn from(err: candle_core::Error) -> Self {
        Self::inference(err)
    }
}

impl IntoResponse for CaptionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "caption request failed");
        } else {
            tracing::warn!(error = %self, "caption request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
