//! Primary detector: edge-based boundary extraction.
//!
//! The strong pre-blur is the load-bearing step — it erases detail inside a
//! photograph (faces, clothing, printed frames) so the only structure left
//! for the masks to latch onto is the photo's outer border. Two masks are
//! combined: a Sobel-magnitude mask thresholded relative to the image's
//! median intensity, and a local-mean deviation mask with an absolute
//! offset. The offset is what lets a genuinely low-contrast boundary fall
//! through to the texture fallback instead of being binarized into noise.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::filter::{bilateral_filter, gaussian_blur_f32};
use imageproc::gradients::sobel_gradients;
use imageproc::morphology::{close, dilate};
use tracing::trace;

use super::contours::external_contours;
use super::preprocessing::PyramidLevel;
use super::windows::WindowStats;
use super::{DetectionStrategy, StrategyOutcome};
use crate::models::Strategy;

pub struct EdgeStrategy {
    /// Sigma of the detail-erasing pre-blur.
    pre_blur_sigma: f32,
    /// Edge-preserving smoothing parameters.
    bilateral_window: u32,
    bilateral_sigma_color: f32,
    bilateral_sigma_spatial: f32,
    /// Gradient threshold = median intensity times this factor, clamped.
    gradient_median_factor: f32,
    gradient_floor: f32,
    gradient_ceil: f32,
    /// Local-mean deviation mask: window radius and absolute offset.
    mean_radius: u32,
    mean_offset: f32,
    /// Morphological gap closing and slight dilation.
    close_k: u8,
    dilate_k: u8,
}

impl Default for EdgeStrategy {
    fn default() -> Self {
        Self {
            pre_blur_sigma: 2.0,
            bilateral_window: 7,
            bilateral_sigma_color: 25.0,
            bilateral_sigma_spatial: 5.0,
            gradient_median_factor: 0.66,
            gradient_floor: 60.0,
            gradient_ceil: 160.0,
            mean_radius: 4,
            mean_offset: 14.0,
            close_k: 1,
            dilate_k: 1,
        }
    }
}

impl EdgeStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn binary_mask(&self, smoothed: &GrayImage) -> GrayImage {
        let gradients = sobel_gradients(smoothed);
        let median = median_intensity(smoothed);
        let gradient_threshold = (median * self.gradient_median_factor)
            .clamp(self.gradient_floor, self.gradient_ceil);
        let stats = WindowStats::new(smoothed);

        let (width, height) = smoothed.dimensions();
        let mut mask = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let magnitude = f32::from(gradients.get_pixel(x, y)[0]);
                let deviation =
                    (f32::from(smoothed.get_pixel(x, y)[0]) - stats.mean(x, y, self.mean_radius))
                        .abs();
                if magnitude > gradient_threshold || deviation > self.mean_offset {
                    mask.put_pixel(x, y, image::Luma([255u8]));
                }
            }
        }
        mask
    }
}

impl DetectionStrategy for EdgeStrategy {
    fn tag(&self) -> Strategy {
        Strategy::Edge
    }

    fn detect(&self, level: &PyramidLevel) -> StrategyOutcome {
        let blurred = gaussian_blur_f32(&level.normalized, self.pre_blur_sigma);
        let smoothed = bilateral_filter(
            &blurred,
            self.bilateral_window,
            self.bilateral_sigma_color,
            self.bilateral_sigma_spatial,
        );

        let mask = self.binary_mask(&smoothed);
        let closed = close(&mask, Norm::LInf, self.close_k);
        let dilated = dilate(&closed, Norm::LInf, self.dilate_k);

        let contours = external_contours(&dilated);
        trace!(
            scale = level.scale,
            contours = contours.len(),
            "edge strategy finished"
        );
        if contours.is_empty() {
            StrategyOutcome::Empty
        } else {
            StrategyOutcome::Detected(contours)
        }
    }
}

/// Median intensity from a 256-bin histogram.
fn median_intensity(image: &GrayImage) -> f32 {
    let mut hist = [0u64; 256];
    for pixel in image.pixels() {
        hist[pixel[0] as usize] += 1;
    }
    let total = u64::from(image.width()) * u64::from(image.height());
    let half = total / 2;
    let mut cumulative = 0u64;
    for (value, &count) in hist.iter().enumerate() {
        cumulative += count;
        if cumulative > half {
            return value as f32;
        }
    }
    0.0
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
    fn median_of_uniform_image() {
        let img = GrayImage::from_pixel(10, 10, Luma([42u8]));
        assert_eq!(median_intensity(&img), 42.0);
    }

    #[test]
    fn uniform_level_yields_empty() {
        let level = level_for(GrayImage::from_pixel(256, 256, Luma([128u8])));
        assert!(matches!(
            EdgeStrategy::new().detect(&level),
            StrategyOutcome::Empty
        ));
    }

    #[test]
    fn high_contrast_rectangle_yields_contours() {
        let mut gray = GrayImage::from_pixel(400, 300, Luma([0u8]));
        for y in 75..225 {
            for x in 100..300 {
                gray.put_pixel(x, y, Luma([235u8]));
            }
        }
        let level = level_for(gray);
        match EdgeStrategy::new().detect(&level) {
            StrategyOutcome::Detected(contours) => assert!(!contours.is_empty()),
            StrategyOutcome::Empty => panic!("expected contours around the rectangle"),
        }
    }
}
