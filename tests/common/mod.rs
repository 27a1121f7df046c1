#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use caption_service::{api, CaptionError, CaptionModel, CaptionService, Config};
use image::{DynamicImage, ImageOutputFormat, RgbImage};

pub const BOUNDARY: &str = "caption-service-test-boundary";

/// Deterministic stand-in for BLIP: describes the raster it was given, so a
/// caption can be traced back to the upload that produced it.
pub struct DescribingModel {
    pub delay: Duration,
}

impl CaptionModel for DescribingModel {
    fn caption(&mut self, image: &RgbImage) -> Result<String, CaptionError> {
        std::thread::sleep(self.delay);

        let pixels = (image.width() * image.height()).max(1) as u64;
        let mut sum = [0u64; 3];
        for pixel in image.pixels() {
            for (acc, channel) in sum.iter_mut().zip(pixel.0) {
                *acc += channel as u64;
            }
        }
        Ok(format!(
            "a {}x{} picture with mean colour #{:02x}{:02x}{:02x}",
            image.width(),
            image.height(),
            sum[0] / pixels,
            sum[1] / pixels,
            sum[2] / pixels,
        ))
    }
}

pub struct FailingModel;

impl CaptionModel for FailingModel {
    fn caption(&mut self, _image: &RgbImage) -> Result<String, CaptionError> {
        Err(CaptionError::inference("device out of memory"))
    }
}

pub fn router_with(model: impl CaptionModel + 'static, config: &Config) -> Router {
    let service = CaptionService::new("test/describing-model", model);
    api::create_router(api::AppState::new(service), config)
}

pub fn router() -> Router {
    router_with(
        DescribingModel {
            delay: Duration::ZERO,
        },
        &Config::default(),
    )
}

pub fn encode(image: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode test image");
    bytes
}

pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(rgb))),
        ImageOutputFormat::Png,
    )
}

/// Builds a `multipart/form-data` body from `(field name, content)` parts.
pub fn multipart_body(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, content) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"upload.bin\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn generate_request(parts: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("build request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn file_request(content: &[u8]) -> Request<Body> {
    generate_request(&[("file", content)])
}

/// Panics on its first call, then captions like `DescribingModel`.
pub struct PanicsOnceModel {
    pub panicked: bool,
}

impl CaptionModel for PanicsOnceModel {
    fn caption(&mut self, image: &RgbImage) -> Result<String, CaptionError> {
        if !self.panicked {
            self.panicked = true;
            panic!("decoder crashed");
        }
        DescribingModel {
            delay: Duration::ZERO,
        }
        .caption(image)
    }
}
