//! Cross-scale non-maximum suppression. The same physical photo surfaces
//! from several pyramid levels and sometimes from both strategies; greedy
//! suppression on bounding-box overlap keeps the highest-confidence copy.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::geometry::bbox_iou;
use crate::models::{RejectedCandidate, RejectionReason, ScoredCandidate};

/// Suppress duplicates and enforce the per-image candidate cap. Returns
/// the survivors in descending confidence order, plus a rejection record
/// for every candidate dropped here.
pub fn suppress(
    mut scored: Vec<ScoredCandidate>,
    config: &PipelineConfig,
) -> (Vec<ScoredCandidate>, Vec<RejectedCandidate>) {
    // total_cmp keeps the order deterministic even for equal confidences.
    scored.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<ScoredCandidate> = Vec::new();
    let mut rejected = Vec::new();

    for item in scored {
        let overlap = kept
            .iter()
            .map(|k| bbox_iou(&k.candidate.corners, &item.candidate.corners))
            .fold(0.0f32, f32::max);

        if overlap > config.nms_iou_threshold {
            debug!(
                confidence = item.confidence,
                iou = overlap,
                "suppressed duplicate candidate"
            );
            rejected.push(reject(item, RejectionReason::Duplicate { iou: overlap }));
        } else if kept.len() >= config.max_candidates {
            rejected.push(reject(item, RejectionReason::CandidateBudget));
        } else {
            kept.push(item);
        }
    }

    (kept, rejected)
}

fn reject(item: ScoredCandidate, reason: RejectionReason) -> RejectedCandidate {
    RejectedCandidate {
        corners: item.candidate.corners,
        scale: item.candidate.scale,
        strategy: item.candidate.strategy,
        confidence: Some(item.confidence),
        reason,
    }
}
