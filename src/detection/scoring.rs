//! Confidence scoring. Every candidate gets a verdict, never an error:
//! either an `Accepted` scored candidate or a `Rejected` record carrying
//! the reason, so tuning sessions can see exactly what was dropped where.

use image::GrayImage;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::geometry::{bounding_box, interior_angles, polygon_area};
use crate::models::{
    Candidate, Quad, RejectedCandidate, RejectionReason, ScoredCandidate, SubScores,
};

const WEIGHT_RECTANGULARITY: f32 = 0.3;
const WEIGHT_CORNERS: f32 = 0.3;
const WEIGHT_AREA: f32 = 0.2;
const WEIGHT_EDGES: f32 = 0.2;

/// Area ratios at or above this score full marks.
const AREA_RATIO_FULL: f64 = 0.02;
/// Below this the candidate is almost certainly a decorative detail.
const AREA_RATIO_FLOOR: f64 = 0.01;

/// Gradient samples taken along each side of the quad.
const SAMPLES_PER_SIDE: u32 = 16;
/// Search distance along the outward normal, in pixels. Masks grow a few
/// pixels past the true boundary, so the strongest gradient sits near but
/// not exactly on the sampled segment.
const NORMAL_SEARCH: i32 = 6;
/// Gradient magnitude that counts as a fully saturated edge.
const EDGE_SATURATION: f32 = 64.0;

/// Per-candidate verdict from the scorer.
pub enum CandidateOutcome {
    Accepted(ScoredCandidate),
    Rejected(RejectedCandidate),
}

/// Score one candidate against the full-resolution grayscale source.
pub fn score(candidate: Candidate, gray: &GrayImage, config: &PipelineConfig) -> CandidateOutcome {
    let quad = &candidate.corners;
    let quad_area = polygon_area(quad);
    if quad_area < 1.0 {
        return reject(candidate, None, RejectionReason::DegenerateQuad);
    }

    let image_area = f64::from(gray.width()) * f64::from(gray.height());
    let ratio = quad_area / image_area;
    if ratio > f64::from(config.max_photo_area_ratio) {
        // Almost certainly the image border itself, not a photo in it.
        return reject(
            candidate,
            None,
            RejectionReason::AreaTooLarge {
                ratio: ratio as f32,
            },
        );
    }

    let scores = SubScores {
        rectangularity: rectangularity(quad, quad_area),
        corner_conformity: corner_conformity(quad),
        area_ratio: area_plausibility(ratio),
        edge_strength: boundary_edge_strength(quad, gray),
    };
    let confidence = (WEIGHT_RECTANGULARITY * scores.rectangularity
        + WEIGHT_CORNERS * scores.corner_conformity
        + WEIGHT_AREA * scores.area_ratio
        + WEIGHT_EDGES * scores.edge_strength)
        .clamp(0.0, 1.0);

    if confidence < config.min_confidence {
        debug!(
            confidence,
            rectangularity = scores.rectangularity,
            corners = scores.corner_conformity,
            area = scores.area_ratio,
            edges = scores.edge_strength,
            "candidate below confidence threshold"
        );
        return reject(
            candidate,
            Some(confidence),
            RejectionReason::LowConfidence { confidence },
        );
    }

    CandidateOutcome::Accepted(ScoredCandidate {
        candidate,
        confidence,
        scores,
    })
}

fn reject(
    candidate: Candidate,
    confidence: Option<f32>,
    reason: RejectionReason,
) -> CandidateOutcome {
    CandidateOutcome::Rejected(RejectedCandidate {
        corners: candidate.corners,
        scale: candidate.scale,
        strategy: candidate.strategy,
        confidence,
        reason,
    })
}

/// Enclosed area over bounding-box area: 1.0 for an axis-aligned
/// rectangle, lower the more the quad deviates or rotates.
fn rectangularity(quad: &Quad, quad_area: f64) -> f32 {
    let (min_x, min_y, max_x, max_y) = bounding_box(quad);
    let bbox_area = f64::from(max_x - min_x) * f64::from(max_y - min_y);
    if bbox_area <= 0.0 {
        return 0.0;
    }
    ((quad_area / bbox_area) as f32).clamp(0.0, 1.0)
}

/// Mean closeness of the interior angles to 90 degrees, with a 45 degree
/// deviation scoring zero.
fn corner_conformity(quad: &Quad) -> f32 {
    let angles = interior_angles(quad);
    let sum: f32 = angles
        .iter()
        .map(|&a| (1.0 - (a - 90.0).abs() / 45.0).clamp(0.0, 1.0))
        .sum();
    sum / 4.0
}

/// Plausibility of the candidate's size relative to the source. Oversized
/// candidates are hard-rejected before this is computed, so only the small
/// end ramps.
fn area_plausibility(ratio: f64) -> f32 {
    if ratio >= AREA_RATIO_FULL {
        1.0
    } else if ratio <= AREA_RATIO_FLOOR {
        0.0
    } else {
        ((ratio - AREA_RATIO_FLOOR) / (AREA_RATIO_FULL - AREA_RATIO_FLOOR)) as f32
    }
}

/// Mean of the strongest gradient found near each boundary sample. The
/// search runs along the side's normal in both directions; a candidate
/// whose corners sit a few pixels off the true border still scores well,
/// but one drifting further off (a coarse-scale duplicate) scores lower.
fn boundary_edge_strength(quad: &Quad, gray: &GrayImage) -> f32 {
    let mut total = 0.0f32;
    let mut samples = 0u32;

    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let len = a.distance(&b);
        if len < f32::EPSILON {
            continue;
        }
        let (nx, ny) = ((b.y - a.y) / len, -(b.x - a.x) / len);

        for s in 0..SAMPLES_PER_SIDE {
            let t = (s as f32 + 0.5) / SAMPLES_PER_SIDE as f32;
            let px = a.x + (b.x - a.x) * t;
            let py = a.y + (b.y - a.y) * t;

            let mut best = 0.0f32;
            for d in -NORMAL_SEARCH..=NORMAL_SEARCH {
                let x = (px + nx * d as f32).round() as i64;
                let y = (py + ny * d as f32).round() as i64;
                best = best.max(gradient_magnitude(gray, x, y));
            }
            total += (best / EDGE_SATURATION).min(1.0);
            samples += 1;
        }
    }

    if samples == 0 {
        0.0
    } else {
        total / samples as f32
    }
}

/// Central-difference gradient magnitude, zero outside the image.
fn gradient_magnitude(gray: &GrayImage, x: i64, y: i64) -> f32 {
    let (w, h) = (i64::from(gray.width()), i64::from(gray.height()));
    if x < 1 || y < 1 || x >= w - 1 || y >= h - 1 {
        return 0.0;
    }
    let at = |x: i64, y: i64| f32::from(gray.get_pixel(x as u32, y as u32)[0]);
    let gx = (at(x + 1, y) - at(x - 1, y)) / 2.0;
    let gy = (at(x, y + 1) - at(x, y - 1)) / 2.0;
    (gx * gx + gy * gy).sqrt()
}
