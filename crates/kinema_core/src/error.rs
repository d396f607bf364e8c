//! Kinema error types

use thiserror::Error;

use crate::world::{Attribute, EntityId};

/// Errors raised while building or applying motions
#[derive(Error, Debug)]
pub enum KinemaError {
    /// Motion duration below one frame
    #[error("Motion duration must be at least one frame, got {0}")]
    InvalidDuration(u32),

    /// Path has no vertices or contains non-finite coordinates
    #[error("Malformed path: {0}")]
    MalformedPath(String),

    /// Target key does not resolve to a live volume
    #[error("Unknown entity: {0:?}")]
    UnknownEntity(EntityId),

    /// Spring parameters outside their domain
    #[error("Invalid spring parameters: {0}")]
    InvalidSpring(String),

    /// Early-stop frame outside `[0, duration)`
    #[error("Early stop frame {frame} is outside 0..{duration}")]
    EarlyStopOutOfRange { frame: u32, duration: u32 },

    /// Motion kind does not apply to the target's shape
    #[error("Motion {motion} is not supported for {shape} volumes")]
    UnsupportedMotion {
        motion: &'static str,
        shape: &'static str,
    },

    /// Attribute missing on the volume or given a value of the wrong type
    #[error("Attribute {attribute:?} mismatch: {reason}")]
    AttributeMismatch {
        attribute: Attribute,
        reason: String,
    },

    /// Frame sink failed to capture a frame
    #[error("Frame sink failed: {0}")]
    Sink(String),
}

/// Result type for kinema operations
pub type Result<T> = std::result::Result<T, KinemaError>;
