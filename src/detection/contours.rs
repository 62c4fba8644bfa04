//! Candidate extraction: turns a strategy's binary-mask contours into
//! validated quadrilaterals in original-image coordinates.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use tracing::trace;

use super::preprocessing::PyramidLevel;
use crate::config::PipelineConfig;
use crate::geometry::{interior_angles, order_corners, polygon_area};
use crate::models::{Candidate, Corner, Quad, Strategy};

/// A traced boundary from a binary mask, in level coordinates.
pub type TracedContour = Vec<Point<i32>>;

/// Polygon approximation tolerances as fractions of the contour perimeter.
/// Every 4-corner fit across the whole ladder competes; stopping at the
/// first fit historically picked interior rectangles (a frame printed
/// inside the photo) over the true outer border.
const EPSILON_LADDER: [f64; 7] = [0.01, 0.02, 0.03, 0.05, 0.08, 0.12, 0.15];

/// Outermost boundaries of a binary mask. Hole borders and nested
/// contours are ignored; only the external outline of each connected
/// region can be a photo border.
pub fn external_contours(mask: &GrayImage) -> Vec<TracedContour> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Extract quadrilateral candidates from raw contours found at one pyramid
/// level. Corners of each returned candidate are rescaled to
/// original-image coordinates and ordered clockwise from top-left.
pub fn extract_candidates(
    contours: Vec<TracedContour>,
    level: &PyramidLevel,
    strategy: Strategy,
    config: &PipelineConfig,
) -> Vec<Candidate> {
    let scale = f64::from(level.scale);
    // Relaxed area floor: the nominal minimum scaled down so borders that
    // straddle it are not discarded before scoring gets a say.
    let area_floor = config.min_contour_area * config.min_area_ratio * scale * scale;

    let mut measured: Vec<(TracedContour, f64, f64)> = contours
        .into_iter()
        .filter(|points| points.len() >= 4)
        .map(|points| {
            let corners: Vec<Corner> = points
                .iter()
                .map(|p| Corner::new(p.x as f32, p.y as f32))
                .collect();
            let area = polygon_area(&corners);
            let perimeter = arc_length(&points, true);
            (points, area, perimeter)
        })
        .filter(|(_, area, _)| *area >= area_floor)
        .collect();

    // Largest contours first, bounded compute per level.
    measured.sort_by(|a, b| b.1.total_cmp(&a.1));
    measured.truncate(config.max_contours_per_level);

    let mut candidates = Vec::new();
    for (points, area, perimeter) in measured {
        let Some(quad) = best_quad(&points, perimeter, config) else {
            continue;
        };
        let inv = 1.0 / level.scale;
        let corners: Quad = quad.map(|c| Corner::new(c.x * inv, c.y * inv));
        candidates.push(Candidate {
            corners: order_corners(corners),
            scale: level.scale,
            strategy,
            contour_area: area / (scale * scale),
            perimeter: perimeter / scale,
        });
    }

    trace!(
        scale = level.scale,
        strategy = %strategy,
        candidates = candidates.len(),
        "contour analysis finished"
    );
    candidates
}

/// Run the approximation ladder and keep the largest-area 4-corner polygon
/// that passes angle validation.
fn best_quad(points: &[Point<i32>], perimeter: f64, config: &PipelineConfig) -> Option<Quad> {
    let mut best: Option<(Quad, f64)> = None;

    for fraction in EPSILON_LADDER {
        let approx = approximate_polygon_dp(points, fraction * perimeter, true);
        if approx.len() != 4 {
            continue;
        }
        let quad = order_corners([
            Corner::new(approx[0].x as f32, approx[0].y as f32),
            Corner::new(approx[1].x as f32, approx[1].y as f32),
            Corner::new(approx[2].x as f32, approx[2].y as f32),
            Corner::new(approx[3].x as f32, approx[3].y as f32),
        ]);
        if !angles_acceptable(&quad, config) {
            continue;
        }
        let area = polygon_area(&quad);
        if area <= 0.0 {
            continue;
        }
        match &best {
            Some((_, best_area)) if *best_area >= area => {}
            _ => best = Some((quad, area)),
        }
    }

    best.map(|(quad, _)| quad)
}

/// Relaxed corner validation: at least 3 of 4 interior angles inside the
/// configured window. Real-world photos are rarely perfect rectangles.
fn angles_acceptable(quad: &Quad, config: &PipelineConfig) -> bool {
    let angles = interior_angles(quad);
    if angles.iter().any(|&a| a < 1.0) {
        return false;
    }
    let passing = angles
        .iter()
        .filter(|&&a| a >= config.min_corner_angle && a <= config.max_corner_angle)
        .count();
    passing >= 3
}
