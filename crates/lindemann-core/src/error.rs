//! Error types for the Lindemann numerical engine.

use thiserror::Error;

/// Result type alias for `lindemann-core` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the trajectory engine.
///
/// These cover only the engine-level kinds; the CLI wraps this type with its own
/// I/O-facing variants (trajectory-not-found, unsupported mode, output-write-failed).
#[derive(Error, Debug)]
pub enum Error {
    /// The frame source promised zero frames (`F = 0`).
    #[error("trajectory has no frames")]
    EmptyTrajectory,

    /// Fewer than two atoms; no pairs exist.
    #[error("need at least 2 atoms to form a pair, got {0}")]
    InsufficientAtoms(usize),

    /// The frame source yielded fewer frames than it advertised while the engine was
    /// mid-stream.
    #[error("frame source advertised {advertised} frames but yielded only {yielded}")]
    FrameCountMismatch {
        /// Number of frames the source reported via `num_frames()`.
        advertised: usize,
        /// Number of frames actually produced before the source ran dry.
        yielded: usize,
    },
}
