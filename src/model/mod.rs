pub mod blip;

use image::RgbImage;

use crate::error::CaptionError;

/// Pretrained checkpoint served by this process. Not configurable.
pub const MODEL_ID: &str = "Salesforce/blip-image-captioning-base";

/// An image-to-text model resident in memory.
///
/// Implementations may keep per-call scratch state (the BLIP decoder keeps a
/// kv-cache), hence `&mut self`. Callers that share a model across requests
/// must serialise access, see [`crate::CaptionService`].
pub trait CaptionModel: Send {
    fn caption(&mut self, image: &RgbImage) -> Result<String, CaptionError>;
}

impl<M: CaptionModel + ?Sized> CaptionModel for Box<M> {
    fn caption(&mut self, image: &RgbImage) -> Result<String, CaptionError> {
        (**self).caption(image)
    }
}
