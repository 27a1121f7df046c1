use std::sync::{Mutex, PoisonError};

use crate::{error::CaptionError, model::CaptionModel, preprocess};

/// The loaded model behind a lock, built once at startup and shared by every
/// request through an `Arc`.
///
/// Decoding the upload happens outside the lock; only the model call is
/// serialised.
pub struct CaptionService {
    model_id: String,
    model: Mutex<Box<dyn CaptionModel>>,
}

impl CaptionService {
    pub fn new(model_id: impl Into<String>, model: impl CaptionModel + 'static) -> Self {
        Self {
            model_id: model_id.into(),
            model: Mutex::new(Box::new(model)),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Blocking. Run it off the async executor.
    pub fn caption_bytes(&self, bytes: &[u8]) -> Result<String, CaptionError> {
        let image = preprocess::decode_rgb(bytes)?;
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "image decoded"
        );

        // every caption call starts from a fresh decoder state, so a model
        // that panicked mid-request is still usable
        let mut model = self.model.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("previous caption request panicked, recovering model lock");
            self.model.clear_poison();
            PoisonError::into_inner(poisoned)
        });
        model.caption(&image)
    }
}
