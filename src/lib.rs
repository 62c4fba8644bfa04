//! photolift detects photographs inside a larger image (a scanned album
//! page, a snapshot of prints on a table) and extracts each one as an
//! upright, perspective-corrected image.
//!
//! The engine runs a multi-scale pyramid, an edge-based detector with a
//! texture-based fallback for low-contrast borders, quadrilateral fitting
//! on the resulting contours, confidence scoring, cross-scale duplicate
//! suppression and quality-gated perspective correction. See
//! [`DetectionPipeline`] for the entry point and [`PipelineConfig`] for
//! the tuning knobs.

pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod models;

pub use config::PipelineConfig;
pub use detection::DetectionPipeline;
pub use error::{PhotoliftError, Result};
pub use models::{
    Candidate, Corner, DetectionReport, ExtractedPhoto, Quad, RejectedCandidate, RejectionReason,
    ScoredCandidate, Strategy, SubScores,
};

use image::DynamicImage;

/// One-shot detection with a throwaway pipeline.
pub fn detect_photos(image: &DynamicImage, config: &PipelineConfig) -> Result<DetectionReport> {
    DetectionPipeline::new(config.clone())?.detect(image)
}

/// Decode an encoded image (any format the `image` crate recognizes) and
/// run detection on it.
pub fn detect_photos_from_bytes(bytes: &[u8], config: &PipelineConfig) -> Result<DetectionReport> {
    let image = image::load_from_memory(bytes)?;
    detect_photos(&image, config)
}
