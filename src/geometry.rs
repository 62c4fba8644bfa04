//! Quadrilateral helpers shared by the detection stages: canonical corner
//! ordering, shoelace area, interior angles, side lengths and bounding-box
//! overlap.

use crate::models::{Corner, Quad};

/// Reorder four corners into the canonical convention: clockwise starting
/// nearest the top-left. Corners are sorted by angle around the centroid,
/// which keeps all four points distinct even for a 45 degree diamond where
/// the classic sum/difference extrema tie. The starting corner minimizes
/// x + y, ties broken on smaller y, then smaller x.
pub fn order_corners(corners: Quad) -> Quad {
    let cx = corners.iter().map(|c| c.x).sum::<f32>() / 4.0;
    let cy = corners.iter().map(|c| c.y).sum::<f32>() / 4.0;

    // atan2 in image coordinates (y down) ascends clockwise.
    let mut ordered = corners;
    ordered.sort_by(|a, b| {
        (a.y - cy)
            .atan2(a.x - cx)
            .total_cmp(&(b.y - cy).atan2(b.x - cx))
    });

    let mut start = 0;
    for i in 1..4 {
        let (a, b) = (ordered[i], ordered[start]);
        let key_a = (a.x + a.y, a.y, a.x);
        let key_b = (b.x + b.y, b.y, b.x);
        if key_a < key_b {
            start = i;
        }
    }
    ordered.rotate_left(start);
    ordered
}

/// Absolute polygon area via the shoelace formula.
pub fn polygon_area(points: &[Corner]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0f64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += f64::from(a.x) * f64::from(b.y) - f64::from(b.x) * f64::from(a.y);
    }
    (sum / 2.0).abs()
}

/// Interior angle at each corner, in degrees.
pub fn interior_angles(quad: &Quad) -> [f32; 4] {
    let mut angles = [0.0f32; 4];
    for i in 0..4 {
        let prev = quad[(i + 3) % 4];
        let cur = quad[i];
        let next = quad[(i + 1) % 4];

        let v1 = (prev.x - cur.x, prev.y - cur.y);
        let v2 = (next.x - cur.x, next.y - cur.y);
        let n1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
        let n2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
        if n1 < f32::EPSILON || n2 < f32::EPSILON {
            angles[i] = 0.0;
            continue;
        }
        let cos = ((v1.0 * v2.0 + v1.1 * v2.1) / (n1 * n2)).clamp(-1.0, 1.0);
        angles[i] = cos.acos().to_degrees();
    }
    angles
}

/// Side lengths in corner order: top, right, bottom, left.
pub fn side_lengths(quad: &Quad) -> [f32; 4] {
    [
        quad[0].distance(&quad[1]),
        quad[1].distance(&quad[2]),
        quad[2].distance(&quad[3]),
        quad[3].distance(&quad[0]),
    ]
}

/// Axis-aligned bounding box as (min_x, min_y, max_x, max_y).
pub fn bounding_box(quad: &Quad) -> (f32, f32, f32, f32) {
    let mut min_x = quad[0].x;
    let mut min_y = quad[0].y;
    let mut max_x = quad[0].x;
    let mut max_y = quad[0].y;
    for c in &quad[1..] {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    (min_x, min_y, max_x, max_y)
}

/// Intersection-over-union of the two quads' bounding boxes.
pub fn bbox_iou(a: &Quad, b: &Quad) -> f32 {
    let (ax0, ay0, ax1, ay1) = bounding_box(a);
    let (bx0, by0, bx1, by1) = bounding_box(b);

    let ix0 = ax0.max(bx0);
    let iy0 = ay0.max(by0);
    let ix1 = ax1.min(bx1);
    let iy1 = ay1.min(by1);

    let inter = (ix1 - ix0).max(0.0) * (iy1 - iy0).max(0.0);
    let area_a = (ax1 - ax0) * (ay1 - ay0);
    let area_b = (bx1 - bx0) * (by1 - by0);
    let union = area_a + area_b - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(pts: [(f32, f32); 4]) -> Quad {
        [
            Corner::new(pts[0].0, pts[0].1),
            Corner::new(pts[1].0, pts[1].1),
            Corner::new(pts[2].0, pts[2].1),
            Corner::new(pts[3].0, pts[3].1),
        ]
    }

    #[test]
    fn orders_shuffled_rectangle() {
        let shuffled = quad([(10.0, 10.0), (0.0, 10.0), (0.0, 0.0), (10.0, 0.0)]);
        let ordered = order_corners(shuffled);
        assert_eq!(ordered[0], Corner::new(0.0, 0.0));
        assert_eq!(ordered[1], Corner::new(10.0, 0.0));
        assert_eq!(ordered[2], Corner::new(10.0, 10.0));
        assert_eq!(ordered[3], Corner::new(0.0, 10.0));
    }

    #[test]
    fn orders_rotated_quad() {
        // Diamond: (5, 0) and (0, 5) tie on x + y; the smaller y wins.
        let diamond = quad([(5.0, 0.0), (10.0, 5.0), (5.0, 10.0), (0.0, 5.0)]);
        let ordered = order_corners(diamond);
        assert_eq!(ordered[0], Corner::new(5.0, 0.0));
        assert_eq!(ordered[1], Corner::new(10.0, 5.0));
        assert_eq!(ordered[2], Corner::new(5.0, 10.0));
        assert_eq!(ordered[3], Corner::new(0.0, 5.0));
    }

    #[test]
    fn diamond_corners_stay_distinct() {
        // The sum/difference extrema tie on a 45 degree diamond; ordering
        // must still return four distinct corners, not collapse two slots
        // onto one point and degenerate the quad.
        let diamond = quad([(5.0, 0.0), (10.0, 5.0), (5.0, 10.0), (0.0, 5.0)]);
        let ordered = order_corners(diamond);
        for i in 0..4 {
            for j in i + 1..4 {
                assert_ne!(ordered[i], ordered[j], "slots {i} and {j} collapsed");
            }
        }
        assert!(polygon_area(&ordered) > 0.0);
        for a in interior_angles(&ordered) {
            assert!((a - 90.0).abs() < 1e-3);
        }
    }

    #[test]
    fn shoelace_area_of_rectangle() {
        let r = quad([(0.0, 0.0), (8.0, 0.0), (8.0, 6.0), (0.0, 6.0)]);
        assert!((polygon_area(&r) - 48.0).abs() < 1e-6);
    }

    #[test]
    fn right_angles_for_rectangle() {
        let r = quad([(0.0, 0.0), (8.0, 0.0), (8.0, 6.0), (0.0, 6.0)]);
        for a in interior_angles(&r) {
            assert!((a - 90.0).abs() < 1e-3);
        }
    }

    #[test]
    fn iou_of_identical_quads_is_one() {
        let r = quad([(0.0, 0.0), (8.0, 0.0), (8.0, 6.0), (0.0, 6.0)]);
        assert!((bbox_iou(&r, &r) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_quads_is_zero() {
        let a = quad([(0.0, 0.0), (8.0, 0.0), (8.0, 6.0), (0.0, 6.0)]);
        let b = quad([(20.0, 20.0), (28.0, 20.0), (28.0, 26.0), (20.0, 26.0)]);
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn side_lengths_in_order() {
        let r = quad([(0.0, 0.0), (8.0, 0.0), (8.0, 6.0), (0.0, 6.0)]);
        let s = side_lengths(&r);
        assert_eq!(s, [8.0, 6.0, 8.0, 6.0]);
    }
}
