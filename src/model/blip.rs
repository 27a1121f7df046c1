use std::path::Path;

use anyhow::anyhow;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip::{self, VisionConfig};
use candle_transformers::models::blip_text;
use hf_hub::api::sync::Api;
use image::RgbImage;
use tokenizers::Tokenizer;

use super::CaptionModel;
use crate::{error::CaptionError, preprocess};

/// `[DEC]`, the decoder start token of the BLIP vocabulary.
pub const BOS_TOKEN_ID: u32 = 30522;
/// `[SEP]`, ends a caption.
pub const SEP_TOKEN_ID: u32 = 102;
/// Upper bound on the generated sequence, start token included.
pub const MAX_LENGTH: usize = 20;

const WEIGHTS_FILE: &str = "model.safetensors";
const TOKENIZER_FILE: &str = "tokenizer.json";

pub fn base_config() -> blip::Config {
    let text_config = blip_text::Config {
        vocab_size: 30524,
        hidden_size: 768,
        encoder_hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 768,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        max_position_embeddings: 512,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-12,
        is_decoder: true,
    };
    let vision_config = VisionConfig {
        hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 512,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        image_size: preprocess::IMAGE_SIZE as usize,
        patch_size: 16,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-5,
    };

    blip::Config {
        text_config,
        vision_config,
        projection_dim: 512,
        image_text_hidden_size: 256,
    }
}

/// BLIP captioning model with its tokenizer, decoded greedily.
pub struct Blip {
    model: blip::BlipForConditionalGeneration,
    tokenizer: Tokenizer,
    logits_processor: LogitsProcessor,
    device: Device,
}

impl Blip {
    /// Downloads (or reuses the local hub cache of) `model_id` and loads it.
    pub fn from_hub(model_id: &str, device: Device) -> anyhow::Result<Self> {
        tracing::info!(model_id, "fetching model files");
        let repo = Api::new()?.model(model_id.to_string());
        let weights = repo.get(WEIGHTS_FILE)?;
        let tokenizer = repo.get(TOKENIZER_FILE)?;
        Self::from_files(weights, tokenizer, device)
    }

    pub fn from_files(
        weights: impl AsRef<Path>,
        tokenizer: impl AsRef<Path>,
        device: Device,
    ) -> anyhow::Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer.as_ref())
            .map_err(|e| anyhow!("failed to load tokenizer: {e}"))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights.as_ref()], DType::F32, &device)?
        };
        let model = blip::BlipForConditionalGeneration::new(&base_config(), vb)?;
        tracing::info!(device = ?device, "model weights loaded");

        Ok(Self {
            model,
            tokenizer,
            // no temperature: argmax, so captions are reproducible
            logits_processor: LogitsProcessor::new(0, None, None),
            device,
        })
    }
}

impl CaptionModel for Blip {
    fn caption(&mut self, image: &RgbImage) -> Result<String, CaptionError> {
        let pixel_values = preprocess::to_pixel_values(image, &self.device)?;
        let image_embeds = self.model.vision_model().forward(&pixel_values.unsqueeze(0)?)?;

        self.model.text_decoder().reset_kv_cache();

        let model = &mut self.model;
        let logits_processor = &mut self.logits_processor;
        let device = &self.device;
        let token_ids = greedy_decode(|context| {
            let input_ids = Tensor::new(context, device)?.unsqueeze(0)?;
            let logits = model.text_decoder().forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            logits_processor.sample(&logits)
        })?;

        decode_caption(&self.tokenizer, &token_ids)
    }
}

/// Turns generated ids into caption text, dropping `[DEC]` and any other
/// special token. A sequence with no text left (the decoder emitted `[SEP]`
/// straight away) is an inference failure rather than an empty caption.
pub fn decode_caption(tokenizer: &Tokenizer, token_ids: &[u32]) -> Result<String, CaptionError> {
    let caption = tokenizer
        .decode(token_ids, true)
        .map_err(CaptionError::inference)?;
    let caption = caption.trim();
    if caption.is_empty() {
        return Err(CaptionError::inference("model produced an empty caption"));
    }
    Ok(caption.to_string())
}

/// Runs the decode loop. `next_token` receives only the tokens the decoder
/// has not seen yet: the start token on the first step, then the last token
/// pushed, since earlier positions live in the kv-cache.
pub fn greedy_decode<F>(mut next_token: F) -> candle_core::Result<Vec<u32>>
where
    F: FnMut(&[u32]) -> candle_core::Result<u32>,
{
    let mut token_ids = vec![BOS_TOKEN_ID];
    while token_ids.len() < MAX_LENGTH {
        let context = &token_ids[token_ids.len() - 1..];
        let token = next_token(context)?;
        if token == SEP_TOKEN_ID {
            break;
        }
        token_ids.push(token);
    }
    Ok(token_ids)
}
