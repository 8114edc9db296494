//! CLI-level errors: wraps `lindemann-core`'s engine errors with the I/O- and
//! argument-facing kinds spec.md §7 adds for a command-line front end.

use std::path::PathBuf;

use thiserror::Error;

use crate::lammps::ReadError;
use crate::sinks::SinkError;

/// Errors the `lindemann` binary can exit with.
#[derive(Error, Debug)]
pub enum CliError {
    /// A positional trajectory argument did not name an existing file.
    #[error("trajectory file not found: {}", .0.display())]
    TrajectoryNotFound(PathBuf),

    /// The requested combination of mode flags is not one spec.md §6 defines.
    #[error("{0}")]
    UnsupportedMode(String),

    /// Reading the trajectory file failed.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The engine itself rejected the trajectory (too few atoms, no frames, ...).
    #[error(transparent)]
    Engine(#[from] lindemann_core::Error),

    /// Writing a result to its destination failed.
    #[error("failed to write output: {0}")]
    OutputWriteFailed(#[from] SinkError),

    /// Loading `LINDEMANN_*` configuration failed.
    #[error(transparent)]
    Config(#[from] lindemann_core::config::ConfigError),
}
