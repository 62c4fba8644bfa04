//! Multi-scale pyramid construction and illumination normalization.
//!
//! Each pyramid level carries both the plain grayscale downsample and an
//! illumination-normalized variant: shadows and glare are flattened by
//! dividing the image by a heavily blurred copy of itself, then a
//! clip-limited histogram equalization restores usable contrast without
//! over-amplifying nearly-flat regions. The clip limit matters: a full
//! global equalization would stretch a low-contrast photo/background
//! boundary into a strong edge and starve the texture fallback of its job.

use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use tracing::trace;

use crate::config::PipelineConfig;

/// Sigma of the background estimate used to flatten illumination.
const ILLUMINATION_SIGMA: f32 = 15.0;

/// Histogram clip limit as a multiple of the uniform bin height.
const EQUALIZATION_CLIP: f32 = 1.5;

/// One resolution tier of the pyramid.
pub struct PyramidLevel {
    /// Plain grayscale downsample of the source.
    pub gray: GrayImage,
    /// Illumination-normalized, contrast-equalized variant. Detection
    /// strategies run on this buffer.
    pub normalized: GrayImage,
    /// Scale factor relative to the original image.
    pub scale: f32,
}

/// Build all configured levels, largest first. Degenerate input (a
/// near-uniform image) is not an error; downstream stages simply find no
/// contours in it.
pub fn build_pyramid(gray: &GrayImage, config: &PipelineConfig) -> Vec<PyramidLevel> {
    let (width, height) = gray.dimensions();
    let mut levels = Vec::new();

    for &scale in config.active_scales() {
        let level_gray = if (scale - 1.0).abs() < f32::EPSILON {
            gray.clone()
        } else {
            let w = ((width as f32 * scale).round() as u32).max(1);
            let h = ((height as f32 * scale).round() as u32).max(1);
            imageops::resize(gray, w, h, FilterType::CatmullRom)
        };

        let normalized = normalize_illumination(&level_gray);
        trace!(
            scale,
            width = level_gray.width(),
            height = level_gray.height(),
            "built pyramid level"
        );
        levels.push(PyramidLevel {
            gray: level_gray,
            normalized,
            scale,
        });
    }

    levels
}

/// Flatten uneven lighting, then re-equalize with a clipped histogram.
fn normalize_illumination(gray: &GrayImage) -> GrayImage {
    let background = gaussian_blur_f32(gray, ILLUMINATION_SIGMA);
    let mut flattened = GrayImage::new(gray.width(), gray.height());

    for (x, y, pixel) in gray.enumerate_pixels() {
        let bg = f32::from(background.get_pixel(x, y)[0]).max(1.0);
        let v = (f32::from(pixel[0]) / bg * 255.0).round().clamp(0.0, 255.0);
        flattened.put_pixel(x, y, image::Luma([v as u8]));
    }

    equalize_clip_limited(&flattened, EQUALIZATION_CLIP)
}

/// Histogram equalization with the per-bin mass clipped at `clip_factor`
/// times the uniform bin height; clipped excess is redistributed evenly.
pub(crate) fn equalize_clip_limited(gray: &GrayImage, clip_factor: f32) -> GrayImage {
    let total = u64::from(gray.width()) * u64::from(gray.height());
    if total == 0 {
        return gray.clone();
    }

    let mut hist = [0u64; 256];
    for pixel in gray.pixels() {
        hist[pixel[0] as usize] += 1;
    }

    let clip = ((clip_factor * total as f32 / 256.0).ceil() as u64).max(1);
    let mut excess = 0u64;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let bonus = excess / 256;
    for bin in hist.iter_mut() {
        *bin += bonus;
    }

    let clipped_total: u64 = hist.iter().sum();
    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    for (v, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[v] = ((cdf as f64 / clipped_total as f64) * 255.0).round() as u8;
    }

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        out.put_pixel(x, y, image::Luma([lut[pixel[0] as usize]]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn full_mode_builds_all_levels() {
        let gray = GrayImage::from_pixel(200, 100, Luma([128u8]));
        let config = PipelineConfig::default();
        let pyramid = build_pyramid(&gray, &config);
        assert_eq!(pyramid.len(), 3);
        assert_eq!(pyramid[0].gray.dimensions(), (200, 100));
        assert_eq!(pyramid[1].gray.dimensions(), (170, 85));
        assert_eq!(pyramid[2].gray.dimensions(), (120, 60));
    }

    #[test]
    fn fast_mode_builds_two_levels() {
        let gray = GrayImage::from_pixel(200, 100, Luma([128u8]));
        let config = PipelineConfig {
            fast_mode: true,
            ..Default::default()
        };
        assert_eq!(build_pyramid(&gray, &config).len(), 2);
    }

    #[test]
    fn uniform_image_normalizes_without_edges() {
        let gray = GrayImage::from_pixel(64, 64, Luma([128u8]));
        let config = PipelineConfig::default();
        let pyramid = build_pyramid(&gray, &config);
        let normalized = &pyramid[0].normalized;
        let first = normalized.get_pixel(0, 0)[0];
        assert!(normalized.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn clip_limited_equalization_preserves_extremes_order() {
        let mut gray = GrayImage::from_pixel(32, 32, Luma([40u8]));
        for y in 0..32 {
            for x in 16..32 {
                gray.put_pixel(x, y, Luma([200u8]));
            }
        }
        let eq = equalize_clip_limited(&gray, 1.5);
        let dark = eq.get_pixel(0, 0)[0];
        let bright = eq.get_pixel(31, 0)[0];
        assert!(dark < bright);
    }

    #[test]
    fn clip_limit_bounds_low_contrast_amplification() {
        // Two populations 10 levels apart must not be stretched to the
        // full range the way an unclipped equalization would.
        let mut gray = GrayImage::from_pixel(64, 64, Luma([120u8]));
        for y in 0..64 {
            for x in 32..64 {
                gray.put_pixel(x, y, Luma([130u8]));
            }
        }
        let eq = equalize_clip_limited(&gray, 1.5);
        let a = i32::from(eq.get_pixel(0, 0)[0]);
        let b = i32::from(eq.get_pixel(63, 0)[0]);
        assert!((b - a).abs() < 60, "delta {} over-amplified", (b - a).abs());
    }
}
