//! Fallback detector for the beige-on-beige case: a photograph whose border
//! contrast is too weak for the edge masks still carries more internal
//! texture (gradient energy, local variance) than a uniform background.
//! Runs only when the edge strategy produced nothing usable for a level.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::gradients::sobel_gradients;
use imageproc::morphology::{close, dilate};
use tracing::trace;

use super::contours::external_contours;
use super::preprocessing::PyramidLevel;
use super::windows::WindowStats;
use super::{DetectionStrategy, StrategyOutcome};
use crate::models::Strategy;

pub struct TextureStrategy {
    /// Sliding-window radius for the variance map.
    window_radius: u32,
    /// Sobel magnitude threshold for the gradient map.
    gradient_threshold: f32,
    /// Standard-deviation threshold for the variance map.
    std_threshold: f32,
    close_k: u8,
    dilate_k: u8,
}

impl Default for TextureStrategy {
    fn default() -> Self {
        Self {
            window_radius: 4,
            gradient_threshold: 60.0,
            std_threshold: 3.0,
            close_k: 2,
            dilate_k: 1,
        }
    }
}

impl TextureStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn binary_mask(&self, normalized: &GrayImage) -> GrayImage {
        let gradients = sobel_gradients(normalized);
        let stats = WindowStats::new(normalized);

        let (width, height) = normalized.dimensions();
        let mut mask = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let magnitude = f32::from(gradients.get_pixel(x, y)[0]);
                let deviation = stats.variance(x, y, self.window_radius).sqrt();
                if magnitude > self.gradient_threshold || deviation > self.std_threshold {
                    mask.put_pixel(x, y, image::Luma([255u8]));
                }
            }
        }
        mask
    }
}

impl DetectionStrategy for TextureStrategy {
    fn tag(&self) -> Strategy {
        Strategy::Texture
    }

    fn detect(&self, level: &PyramidLevel) -> StrategyOutcome {
        let mask = self.binary_mask(&level.normalized);
        let closed = close(&mask, Norm::LInf, self.close_k);
        let dilated = dilate(&closed, Norm::LInf, self.dilate_k);

        let contours = external_contours(&dilated);
        trace!(
            scale = level.scale,
            contours = contours.len(),
            "texture strategy finished"
        );
        if contours.is_empty() {
            StrategyOutcome::Empty
        } else {
            StrategyOutcome::Detected(contours)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::detection::preprocessing::build_pyramid;
    use image::Luma;

    fn level_for(gray: GrayImage) -> PyramidLevel {
        let config = PipelineConfig {
            pyramid_scales: vec![1.0],
            ..Default::default()
        };
        build_pyramid(&gray, &config).remove(0)
    }

    #[test]
    fn uniform_level_yields_empty() {
        let level = level_for(GrayImage::from_pixel(256, 256, Luma([180u8])));
        assert!(matches!(
            TextureStrategy::new().detect(&level),
            StrategyOutcome::Empty
        ));
    }

    #[test]
    fn textured_region_on_flat_background_yields_contours() {
        let mut gray = GrayImage::from_pixel(400, 300, Luma([128u8]));
        for y in 75..225 {
            for x in 100..300 {
                // Deterministic fine-grained texture, mean close to the
                // background so the border itself is low contrast.
                let noise = ((x * 7 + y * 13) % 17) as i32 - 8;
                let v = (140 + noise).clamp(0, 255) as u8;
                gray.put_pixel(x, y, Luma([v]));
            }
        }
        let level = level_for(gray);
        match TextureStrategy::new().detect(&level) {
            StrategyOutcome::Detected(contours) => assert!(!contours.is_empty()),
            StrategyOutcome::Empty => panic!("expected contours around the textured region"),
        }
    }
}
