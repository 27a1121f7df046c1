use candle_core::{DType, Device, Tensor};
use image::{imageops::FilterType, RgbImage};

use crate::error::CaptionError;

/// Side of the square input the BLIP vision tower expects.
pub const IMAGE_SIZE: u32 = 384;

// CLIP statistics, shared by the BLIP image processor.
const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Decodes an uploaded payload into an 8-bit RGB raster.
///
/// The container format is sniffed from the bytes themselves. Grayscale is
/// expanded to three channels and any alpha channel is dropped.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, CaptionError> {
    let image = image::load_from_memory(bytes)?;
    Ok(image.to_rgb8())
}

/// Turns an RGB raster into the `(3, 384, 384)` f32 tensor the vision model
/// consumes: exact resize, rescale to `[0, 1]`, per-channel normalisation.
pub fn to_pixel_values(image: &RgbImage, device: &Device) -> candle_core::Result<Tensor> {
    let resized = image::imageops::resize(image, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);
    let side = IMAGE_SIZE as usize;
    let data = Tensor::from_vec(resized.into_raw(), (side, side, 3), &Device::Cpu)?
        .permute((2, 0, 1))?;
    let mean = Tensor::new(&MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&STD, &Device::Cpu)?.reshape((3, 1, 1))?;

    (data.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?
        .to_device(device)
}
