//! The public error type.
//!
//! Geometric edge cases — bad coordinates, singular transforms, malformed
//! dash arrays — are recovered silently inside the pipeline and never
//! surface here; callers always get a valid (possibly empty) mask for
//! them. The only reportable failures are invalid stroke parameters,
//! which are caller mistakes worth rejecting up front.

use thiserror::Error;

/// Errors reported by the engine entry points.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum Error {
    /// Stroke width must be a positive finite number.
    #[error("stroke width must be positive and finite, got {0}")]
    InvalidStrokeWidth(f32),

    /// Miter limit must be a finite number >= 1.
    #[error("miter limit must be >= 1, got {0}")]
    InvalidMiterLimit(f32),
}
