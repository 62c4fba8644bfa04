use thiserror::Error;

/// Errors surfaced to callers of the detection engine.
///
/// "Nothing found" is not represented here: an image with no detectable
/// photographs yields an empty [`crate::DetectionReport`], and a candidate
/// that fails a quality gate becomes a [`crate::RejectedCandidate`] in that
/// report. Only malformed input and invalid configuration are fatal.
#[derive(Debug, Error)]
pub enum PhotoliftError {
    /// The input bytes could not be decoded as an image.
    #[error("failed to decode input image: {0}")]
    Decode(#[from] image::ImageError),

    /// The decoded image exceeds the configured pixel budget.
    #[error("image too large: {width}x{height} exceeds {max_pixels} pixels")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// A configuration bound is out of range. Raised once, at pipeline
    /// construction, never during per-image processing.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PhotoliftError>;
