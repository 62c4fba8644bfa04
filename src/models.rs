use image::RgbImage;
use serde::{Deserialize, Serialize};

/// A corner point in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    pub x: f32,
    pub y: f32,
}

impl Corner {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Corner) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Four corners ordered clockwise starting nearest the top-left.
/// The ordering is canonical and survives every transform so the
/// perspective correction is deterministic.
pub type Quad = [Corner; 4];

/// Which detector produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Edge,
    Texture,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Edge => write!(f, "edge"),
            Strategy::Texture => write!(f, "texture"),
        }
    }
}

/// A quadrilateral region proposed by one strategy at one pyramid level.
/// Corners are already rescaled to original-image coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub corners: Quad,
    /// Pyramid scale the contour was found at.
    pub scale: f32,
    pub strategy: Strategy,
    /// Raw contour area in original-image pixels.
    pub contour_area: f64,
    /// Raw contour perimeter in original-image pixels.
    pub perimeter: f64,
}

/// Component sub-scores that make up the confidence value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubScores {
    /// Enclosed area over bounding-box area.
    pub rectangularity: f32,
    /// How close the interior angles are to 90 degrees.
    pub corner_conformity: f32,
    /// Plausibility of the candidate's area relative to the full image.
    pub area_ratio: f32,
    /// Gradient strength sampled along the candidate's boundary.
    pub edge_strength: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    /// Aggregate quality in [0, 1].
    pub confidence: f32,
    pub scores: SubScores,
}

/// A perspective-corrected photograph cut out of the source image.
#[derive(Debug, Clone)]
pub struct ExtractedPhoto {
    /// The corrected, upright image buffer.
    pub image: RgbImage,
    pub width: u32,
    pub height: u32,
    /// The candidate this photo was extracted from, corners in
    /// source-image coordinates.
    pub candidate: ScoredCandidate,
}

/// Why a candidate was dropped. Kept for offline tuning; never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Confidence below the configured minimum.
    LowConfidence { confidence: f32 },
    /// Candidate covers too much of the source image.
    AreaTooLarge { ratio: f32 },
    /// Quad collapsed to (near) zero area or a zero-length side.
    DegenerateQuad,
    /// Suppressed as a cross-scale duplicate of a stronger candidate.
    Duplicate { iou: f32 },
    /// Survived deduplication but fell past the per-image candidate cap.
    CandidateBudget,
    /// Corrected output aspect ratio outside the configured bounds.
    TransformAspect { aspect: f32 },
    /// Corrected output dimensions outside the configured bounds.
    TransformSize { width: u32, height: u32 },
    /// Corrected output mean brightness implausible.
    TransformBrightness { mean: f32 },
    /// The four corners admit no invertible homography.
    TransformSingular,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::LowConfidence { confidence } => {
                write!(f, "confidence {confidence:.3} below threshold")
            }
            RejectionReason::AreaTooLarge { ratio } => {
                write!(f, "area ratio {ratio:.3} too large")
            }
            RejectionReason::DegenerateQuad => write!(f, "degenerate quad"),
            RejectionReason::Duplicate { iou } => {
                write!(f, "duplicate of stronger candidate (iou {iou:.3})")
            }
            RejectionReason::CandidateBudget => write!(f, "over per-image candidate cap"),
            RejectionReason::TransformAspect { aspect } => {
                write!(f, "corrected aspect {aspect:.3} out of bounds")
            }
            RejectionReason::TransformSize { width, height } => {
                write!(f, "corrected size {width}x{height} out of bounds")
            }
            RejectionReason::TransformBrightness { mean } => {
                write!(f, "corrected mean brightness {mean:.1} implausible")
            }
            RejectionReason::TransformSingular => write!(f, "singular perspective transform"),
        }
    }
}

/// A candidate dropped at the scoring, deduplication or correction stage,
/// retrievable for diagnostics without being part of the accepted results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedCandidate {
    pub corners: Quad,
    pub scale: f32,
    pub strategy: Strategy,
    /// Present when the candidate made it past scoring.
    pub confidence: Option<f32>,
    pub reason: RejectionReason,
}

/// Everything one pipeline invocation produced.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    /// Accepted photos, ordered by descending confidence.
    pub photos: Vec<ExtractedPhoto>,
    /// Every candidate dropped along the way, with its reason.
    pub rejected: Vec<RejectedCandidate>,
}

impl DetectionReport {
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}
