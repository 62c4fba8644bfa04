use serde::{Deserialize, Serialize};

use crate::error::{PhotoliftError, Result};

/// All tuning knobs for one pipeline instance.
///
/// The numeric defaults are a starting calibration, not ground truth; every
/// threshold that was historically hand-tuned is exposed here so it can be
/// re-tuned without code changes. The config is validated once when the
/// pipeline is constructed and never re-checked per image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pyramid scale factors relative to the original image, largest first.
    /// Each must be in (0, 1].
    pub pyramid_scales: Vec<f32>,
    /// Fast mode restricts detection to the first two pyramid scales.
    pub fast_mode: bool,
    /// Inputs above this pixel count are refused before detection starts.
    pub max_image_pixels: u64,

    /// Nominal minimum contour area in original-image pixels.
    pub min_contour_area: f64,
    /// Relaxation factor applied to `min_contour_area` when filtering raw
    /// contours, so borders straddling the nominal minimum survive.
    pub min_area_ratio: f64,
    /// Largest contours kept per pyramid level (bounded compute).
    pub max_contours_per_level: usize,

    /// Interior corner angles must fall inside this window, in degrees.
    pub min_corner_angle: f32,
    pub max_corner_angle: f32,

    /// Candidates scoring below this confidence are rejected.
    pub min_confidence: f32,
    /// A candidate covering more than this fraction of the image is rejected.
    pub max_photo_area_ratio: f32,

    /// Two candidates overlapping beyond this IoU are duplicates; the
    /// lower-confidence one is suppressed.
    pub nms_iou_threshold: f32,
    /// Cap on the number of candidates surviving deduplication.
    pub max_candidates: usize,

    /// Accepted aspect ratio range for the corrected output.
    pub min_aspect_ratio: f32,
    pub max_aspect_ratio: f32,
    /// Absolute size bounds for the corrected output, in pixels per side.
    pub min_output_dim: u32,
    pub max_output_dim: u32,
    /// Mean-luma plausibility range for the corrected output; guards against
    /// a degenerate near-black (or blown-out) transform.
    pub min_mean_brightness: f32,
    pub max_mean_brightness: f32,
    /// Inward offset applied to each side of a quad before warping, in
    /// pixels. The detection masks fire a few pixels outside the true
    /// border (window reach plus dilation); warping the raw quad would
    /// bake that slack into the output size and skew its aspect ratio.
    pub quad_inset_px: f32,
    /// Border trimmed from each side of the corrected output, in pixels.
    pub trim_border_px: u32,

    /// Whether the texture strategy is available as a fallback when the edge
    /// strategy finds nothing at a pyramid level.
    pub texture_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pyramid_scales: vec![1.0, 0.85, 0.6],
            fast_mode: false,
            max_image_pixels: 25_000_000,
            min_contour_area: 20_000.0,
            min_area_ratio: 0.4,
            max_contours_per_level: 20,
            min_corner_angle: 50.0,
            max_corner_angle: 130.0,
            min_confidence: 0.5,
            max_photo_area_ratio: 0.85,
            nms_iou_threshold: 0.8,
            max_candidates: 15,
            min_aspect_ratio: 0.2,
            max_aspect_ratio: 5.0,
            min_output_dim: 100,
            max_output_dim: 10_000,
            min_mean_brightness: 2.0,
            max_mean_brightness: 254.0,
            quad_inset_px: 5.0,
            trim_border_px: 2,
            texture_fallback: true,
        }
    }
}

impl PipelineConfig {
    /// Check every bound once. Called by `DetectionPipeline::new`.
    pub fn validate(&self) -> Result<()> {
        if self.pyramid_scales.is_empty() {
            return Err(PhotoliftError::Config(
                "pyramid_scales must not be empty".into(),
            ));
        }
        for &s in &self.pyramid_scales {
            if !(s > 0.0 && s <= 1.0) {
                return Err(PhotoliftError::Config(format!(
                    "pyramid scale {s} outside (0, 1]"
                )));
            }
        }
        if self.max_image_pixels == 0 {
            return Err(PhotoliftError::Config("max_image_pixels must be > 0".into()));
        }
        if self.min_contour_area < 0.0 {
            return Err(PhotoliftError::Config(
                "min_contour_area must be >= 0".into(),
            ));
        }
        if !(self.min_area_ratio > 0.0 && self.min_area_ratio <= 1.0) {
            return Err(PhotoliftError::Config(
                "min_area_ratio must be in (0, 1]".into(),
            ));
        }
        if self.max_contours_per_level == 0 || self.max_candidates == 0 {
            return Err(PhotoliftError::Config(
                "contour and candidate caps must be >= 1".into(),
            ));
        }
        if !(self.min_corner_angle > 0.0
            && self.min_corner_angle < self.max_corner_angle
            && self.max_corner_angle < 180.0)
        {
            return Err(PhotoliftError::Config(format!(
                "corner angle window {}..{} invalid",
                self.min_corner_angle, self.max_corner_angle
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PhotoliftError::Config(
                "min_confidence must be in [0, 1]".into(),
            ));
        }
        if !(self.max_photo_area_ratio > 0.0 && self.max_photo_area_ratio <= 1.0) {
            return Err(PhotoliftError::Config(
                "max_photo_area_ratio must be in (0, 1]".into(),
            ));
        }
        if !(self.nms_iou_threshold > 0.0 && self.nms_iou_threshold <= 1.0) {
            return Err(PhotoliftError::Config(
                "nms_iou_threshold must be in (0, 1]".into(),
            ));
        }
        if !(self.min_aspect_ratio > 0.0 && self.min_aspect_ratio < self.max_aspect_ratio) {
            return Err(PhotoliftError::Config(format!(
                "aspect ratio bounds {}..{} invalid",
                self.min_aspect_ratio, self.max_aspect_ratio
            )));
        }
        if self.min_output_dim == 0 || self.min_output_dim >= self.max_output_dim {
            return Err(PhotoliftError::Config(format!(
                "output size bounds {}..{} invalid",
                self.min_output_dim, self.max_output_dim
            )));
        }
        if !(self.quad_inset_px >= 0.0 && self.quad_inset_px.is_finite()) {
            return Err(PhotoliftError::Config(format!(
                "quad_inset_px {} must be finite and >= 0",
                self.quad_inset_px
            )));
        }
        if !(self.min_mean_brightness >= 0.0
            && self.min_mean_brightness < self.max_mean_brightness
            && self.max_mean_brightness <= 255.0)
        {
            return Err(PhotoliftError::Config(format!(
                "brightness bounds {}..{} invalid",
                self.min_mean_brightness, self.max_mean_brightness
            )));
        }
        Ok(())
    }

    /// Scales actually used for this run. Fast mode keeps the two largest.
    pub fn active_scales(&self) -> &[f32] {
        if self.fast_mode && self.pyramid_scales.len() > 2 {
            &self.pyramid_scales[..2]
        } else {
            &self.pyramid_scales
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_empty_scale_list() {
        let cfg = PipelineConfig {
            pyramid_scales: vec![],
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(PhotoliftError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_scale() {
        let cfg = PipelineConfig {
            pyramid_scales: vec![1.0, 1.5],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_angle_window() {
        let cfg = PipelineConfig {
            min_corner_angle: 130.0,
            max_corner_angle: 50.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_confidence() {
        let cfg = PipelineConfig {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_negative_inset() {
        let cfg = PipelineConfig {
            quad_inset_px: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn fast_mode_limits_scales() {
        let cfg = PipelineConfig {
            fast_mode: true,
            ..Default::default()
        };
        assert_eq!(cfg.active_scales(), &[1.0, 0.85]);
    }
}
