//! Quality-gated perspective correction. A candidate that survived scoring
//! and deduplication is warped to an upright rectangle; implausible outputs
//! are rejected with a transform-stage reason rather than saved.

use image::imageops;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::geometry::side_lengths;
use crate::models::{
    Corner, ExtractedPhoto, Quad, RejectedCandidate, RejectionReason, ScoredCandidate,
};

/// Warp one scored candidate out of the source image. Rejection is a
/// verdict, not an error; the caller files it in the report.
pub fn correct(
    source: &RgbImage,
    scored: ScoredCandidate,
    config: &PipelineConfig,
) -> Result<ExtractedPhoto, RejectedCandidate> {
    let corners = inset_quad(&scored.candidate.corners, config.quad_inset_px);
    // Output dimensions from the longer of each pair of opposing sides, so
    // a tilted photo is not squeezed to its foreshortened edge.
    let [top, right, bottom, left] = side_lengths(&corners);
    let width = top.max(bottom).round() as u32;
    let height = left.max(right).round() as u32;
    if width < 2 || height < 2 {
        return Err(reject(scored, RejectionReason::DegenerateQuad));
    }

    let from = corners.map(|c| (c.x, c.y));
    let to = [
        (0.0, 0.0),
        ((width - 1) as f32, 0.0),
        ((width - 1) as f32, (height - 1) as f32),
        (0.0, (height - 1) as f32),
    ];
    let Some(projection) = Projection::from_control_points(from, to) else {
        return Err(reject(scored, RejectionReason::TransformSingular));
    };

    let mut corrected = RgbImage::new(width, height);
    warp_into(
        source,
        &projection,
        Interpolation::Bilinear,
        Rgb([0u8, 0, 0]),
        &mut corrected,
    );

    let trimmed = trim_border(corrected, config.trim_border_px);
    let (out_w, out_h) = trimmed.dimensions();

    let aspect = out_w as f32 / out_h as f32;
    if aspect < config.min_aspect_ratio || aspect > config.max_aspect_ratio {
        return Err(reject(scored, RejectionReason::TransformAspect { aspect }));
    }
    if out_w < config.min_output_dim
        || out_h < config.min_output_dim
        || out_w > config.max_output_dim
        || out_h > config.max_output_dim
    {
        return Err(reject(
            scored,
            RejectionReason::TransformSize {
                width: out_w,
                height: out_h,
            },
        ));
    }
    let mean = mean_luma(&trimmed);
    if mean < config.min_mean_brightness || mean > config.max_mean_brightness {
        return Err(reject(
            scored,
            RejectionReason::TransformBrightness { mean },
        ));
    }

    debug!(
        width = out_w,
        height = out_h,
        confidence = scored.confidence,
        "extracted photo"
    );
    Ok(ExtractedPhoto {
        image: trimmed,
        width: out_w,
        height: out_h,
        candidate: scored,
    })
}

/// Move every side of the quad inward along its normal and rebuild the
/// corners. The masks the quad was traced from fire a few pixels outside
/// the true border; the slack inflates the short sides proportionally more
/// than the long ones and skews the corrected aspect ratio if left in.
fn inset_quad(quad: &Quad, inset: f32) -> Quad {
    if inset <= 0.0 {
        return *quad;
    }
    let mut out = *quad;
    for i in 0..4 {
        let prev = quad[(i + 3) % 4];
        let cur = quad[i];
        let next = quad[(i + 1) % 4];
        let (ax, ay) = inward_normal(prev, cur);
        let (bx, by) = inward_normal(cur, next);
        out[i] = Corner::new(cur.x + inset * (ax + bx), cur.y + inset * (ay + by));
    }
    out
}

/// Inward unit normal of the side a -> b of a clockwise quad in image
/// coordinates (y down).
fn inward_normal(a: Corner, b: Corner) -> (f32, f32) {
    let len = a.distance(&b).max(f32::EPSILON);
    (-(b.y - a.y) / len, (b.x - a.x) / len)
}

/// Shave residual boundary blur off each side. Skipped when the output is
/// too small to survive it.
fn trim_border(image: RgbImage, trim: u32) -> RgbImage {
    let (w, h) = image.dimensions();
    if trim == 0 || w <= 2 * trim + 1 || h <= 2 * trim + 1 {
        return image;
    }
    imageops::crop_imm(&image, trim, trim, w - 2 * trim, h - 2 * trim).to_image()
}

fn mean_luma(image: &RgbImage) -> f32 {
    let mut sum = 0.0f64;
    for Rgb([r, g, b]) in image.pixels() {
        sum += 0.299 * f64::from(*r) + 0.587 * f64::from(*g) + 0.114 * f64::from(*b);
    }
    let count = f64::from(image.width()) * f64::from(image.height());
    (sum / count.max(1.0)) as f32
}

fn reject(scored: ScoredCandidate, reason: RejectionReason) -> RejectedCandidate {
    RejectedCandidate {
        corners: scored.candidate.corners,
        scale: scored.candidate.scale,
        strategy: scored.candidate.strategy,
        confidence: Some(scored.confidence),
        reason,
    }
}
