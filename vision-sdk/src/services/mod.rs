//! Service client implementations
//!
//! - `streetview`: street-level imagery, one JPEG per heading
//! - `gemini`: generative vision model with inline image input
//! - `detector`: object detection inference server

pub mod common;
pub mod detector;
pub mod gemini;
pub mod streetview;

pub use detector::DetectorClient;
pub use gemini::GeminiClient;
pub use streetview::StreetViewClient;
