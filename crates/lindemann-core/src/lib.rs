//! # lindemann-core
//!
//! Numerical engine for the Lindemann index: a streaming Welford accumulator over
//! pairwise interatomic distances in a molecular-dynamics trajectory, plus the four
//! aggregations built on it (trajectory scalar, per-frame stream, per-atom-per-frame
//! matrix, and a parallel chunked reducer for the scalar).
//!
//! ## Quick start
//!
//! ```
//! use lindemann_core::frame_source::MaterializedTrajectory;
//! use lindemann_core::engine;
//!
//! let frames = vec![
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     vec![[0.01, 0.0, 0.0], [1.0, 0.01, 0.0], [0.0, 1.0, -0.01]],
//! ];
//! let trajectory = MaterializedTrajectory::from_frames(frames);
//! let index = engine::trajectory_scalar(&trajectory)?;
//! assert!(index >= 0.0);
//! # Ok::<(), lindemann_core::error::Error>(())
//! ```
//!
//! This crate has no file I/O and no CLI; see `lindemann-cli` for trajectory reading
//! and output sinks.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod frame_source;
pub mod memory;
pub mod pair_index;
pub mod parallel;
pub mod welford;

pub use distance::Position;
pub use error::{Error, Result};
pub use frame_source::FrameSource;
pub use memory::MemoryEstimate;
pub use welford::WelfordState;
