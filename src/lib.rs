pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod preprocess;
pub mod service;

pub use config::Config;
pub use error::CaptionError;
pub use model::{CaptionModel, MODEL_ID};
pub use service::CaptionService;
