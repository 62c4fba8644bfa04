//! The detection pipeline: multi-scale preprocessing, edge detection with
//! a texture fallback, contour-to-quad analysis, confidence scoring,
//! cross-scale deduplication and quality-gated perspective correction.

pub mod contours;
pub mod dedup;
pub mod edges;
pub mod perspective;
pub mod preprocessing;
pub mod scoring;
pub mod texture;
mod windows;

use image::DynamicImage;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PhotoliftError, Result};
use crate::models::{Candidate, DetectionReport, Strategy};

pub use contours::TracedContour;
pub use edges::EdgeStrategy;
pub use scoring::CandidateOutcome;
pub use texture::TextureStrategy;

/// What one strategy produced for one pyramid level. An empty result is a
/// normal outcome, not an error; it is what hands control to the fallback.
pub enum StrategyOutcome {
    Detected(Vec<TracedContour>),
    Empty,
}

/// A boundary detector that can run on one pyramid level.
pub trait DetectionStrategy: Send + Sync {
    fn tag(&self) -> Strategy;
    fn detect(&self, level: &preprocessing::PyramidLevel) -> StrategyOutcome;
}

/// One configured detection engine. Construction validates the config;
/// a built pipeline never fails on configuration afterwards.
pub struct DetectionPipeline {
    config: PipelineConfig,
    primary: Box<dyn DetectionStrategy>,
    fallback: Option<Box<dyn DetectionStrategy>>,
}

impl DetectionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let fallback: Option<Box<dyn DetectionStrategy>> = if config.texture_fallback {
            Some(Box::new(TextureStrategy::new()))
        } else {
            None
        };
        Ok(Self {
            config,
            primary: Box::new(EdgeStrategy::new()),
            fallback,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detect and extract every photograph in the image. Finding nothing
    /// yields an empty report; only decode and resource limits are errors.
    pub fn detect(&self, image: &DynamicImage) -> Result<DetectionReport> {
        let (width, height) = (image.width(), image.height());
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.config.max_image_pixels {
            return Err(PhotoliftError::ImageTooLarge {
                width,
                height,
                max_pixels: self.config.max_image_pixels,
            });
        }

        let rgb = image.to_rgb8();
        let gray = image.to_luma8();
        let pyramid = preprocessing::build_pyramid(&gray, &self.config);

        let mut candidates: Vec<Candidate> = Vec::new();
        for level in &pyramid {
            candidates.extend(self.detect_level(level));
        }
        debug!(candidates = candidates.len(), "all levels detected");

        let mut report = DetectionReport::default();
        let mut scored = Vec::new();
        for candidate in candidates {
            match scoring::score(candidate, &gray, &self.config) {
                CandidateOutcome::Accepted(s) => scored.push(s),
                CandidateOutcome::Rejected(r) => report.rejected.push(r),
            }
        }

        let (kept, duplicates) = dedup::suppress(scored, &self.config);
        report.rejected.extend(duplicates);

        for item in kept {
            match perspective::correct(&rgb, item, &self.config) {
                Ok(photo) => report.photos.push(photo),
                Err(rejection) => report.rejected.push(rejection),
            }
        }

        info!(
            photos = report.photos.len(),
            rejected = report.rejected.len(),
            "detection finished"
        );
        Ok(report)
    }

    /// Run the primary strategy on one level; fall back to texture when it
    /// yields no usable candidates and the fallback is enabled. Raw contours
    /// that the analyzer discards (noise speckles under the area floor,
    /// non-quads) must not count as a detection, or a single speckle would
    /// suppress the fallback the low-contrast case depends on.
    fn detect_level(&self, level: &preprocessing::PyramidLevel) -> Vec<Candidate> {
        let candidates = self.run_strategy(self.primary.as_ref(), level);
        if !candidates.is_empty() {
            return candidates;
        }
        match &self.fallback {
            Some(fallback) => {
                debug!(
                    scale = level.scale,
                    "edge strategy yielded no candidates, trying fallback"
                );
                self.run_strategy(fallback.as_ref(), level)
            }
            None => Vec::new(),
        }
    }

    fn run_strategy(
        &self,
        strategy: &dyn DetectionStrategy,
        level: &preprocessing::PyramidLevel,
    ) -> Vec<Candidate> {
        match strategy.detect(level) {
            StrategyOutcome::Detected(traced) => {
                contours::extract_candidates(traced, level, strategy.tag(), &self.config)
            }
            StrategyOutcome::Empty => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_fails_construction() {
        let config = PipelineConfig {
            pyramid_scales: vec![],
            ..Default::default()
        };
        assert!(matches!(
            DetectionPipeline::new(config),
            Err(PhotoliftError::Config(_))
        ));
    }

    #[test]
    fn oversized_image_is_refused() {
        let config = PipelineConfig {
            max_image_pixels: 1_000,
            ..Default::default()
        };
        let pipeline = DetectionPipeline::new(config).unwrap();
        let image = DynamicImage::new_rgb8(100, 100);
        assert!(matches!(
            pipeline.detect(&image),
            Err(PhotoliftError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn uniform_image_yields_empty_report() {
        let pipeline = DetectionPipeline::new(PipelineConfig::default()).unwrap();
        let image = DynamicImage::new_rgb8(320, 240);
        let report = pipeline.detect(&image).unwrap();
        assert!(report.is_empty());
    }
}
