//! Parallel chunked reducer (component E).
//!
//! Applies only to the trajectory-scalar aggregate (D.1). Partitions `[0, F)` into
//! `K` contiguous chunks, runs an independent Welford accumulator per chunk (in
//! parallel when the `parallel` feature is enabled), and merges the resulting states
//! with a fixed left fold — `((k0 + k1) + k2) + ...` — so the result is deterministic
//! for a fixed `K`, even though float merge is not bit-exact associative.

use crate::engine::{drive_range, mean_sigma_over_mu};
use crate::error::{Error, Result};
use crate::frame_source::FrameSource;
use crate::welford::WelfordState;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// `min(F, available_parallelism)`, capped so every chunk gets at least one frame.
#[must_use]
pub fn default_chunk_count(num_frames: usize) -> usize {
    #[cfg(feature = "parallel")]
    let parallelism = rayon::current_num_threads();
    #[cfg(not(feature = "parallel"))]
    let parallelism = 1;

    num_frames.min(parallelism).max(1)
}

fn chunk_bounds(num_frames: usize, num_chunks: usize) -> Vec<(usize, usize)> {
    let num_chunks = num_chunks.max(1);
    let chunk_size = num_frames / num_chunks;
    (0..num_chunks)
        .map(|c| {
            let start = c * chunk_size;
            let end = if c + 1 == num_chunks {
                num_frames
            } else {
                (c + 1) * chunk_size
            };
            (start, end)
        })
        .filter(|&(start, end)| end > start)
        .collect()
}

/// Runs the trajectory-scalar aggregate (D.1) with `num_chunks` independent
/// accumulators merged left-to-right.
///
/// # Errors
///
/// Returns [`Error::EmptyTrajectory`] if the source has no frames, or
/// [`Error::InsufficientAtoms`] if it has fewer than two atoms.
pub fn trajectory_scalar_parallel<S>(source: &S, num_chunks: usize) -> Result<f32>
where
    S: FrameSource + ?Sized,
{
    let n = source.num_atoms();
    if n < 2 {
        return Err(Error::InsufficientAtoms(n));
    }
    let f_total = source.num_frames();
    if f_total == 0 {
        return Err(Error::EmptyTrajectory);
    }

    let bounds = chunk_bounds(f_total, num_chunks.max(1));

    #[cfg(feature = "parallel")]
    let states: Vec<WelfordState> = bounds
        .par_iter()
        .map(|&(start, end)| run_chunk(source, start, end))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let states: Vec<WelfordState> = bounds
        .iter()
        .map(|&(start, end)| run_chunk(source, start, end))
        .collect();

    let mut iter = states.into_iter();
    let first = iter
        .next()
        .expect("chunk_bounds always yields at least one chunk for F >= 1");
    let merged = iter.fold(first, |acc, next| acc.merge(&next));

    Ok(mean_sigma_over_mu(&merged, merged.count()))
}

fn run_chunk<S: FrameSource + ?Sized>(source: &S, start: usize, end: usize) -> WelfordState {
    drive_range(source, start, end, |_, _| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::trajectory_scalar;
    use crate::frame_source::MaterializedTrajectory;

    fn cluster(num_atoms: usize, num_frames: usize, jitter_seed: u64) -> MaterializedTrajectory {
        let mut state = jitter_seed.max(1);
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f32 / 1000.0 - 0.5
        };
        let base: Vec<[f32; 3]> = (0..num_atoms)
            .map(|k| [(k % 4) as f32, (k / 4 % 4) as f32, (k / 16) as f32])
            .collect();
        let frames = (0..num_frames)
            .map(|_| {
                base.iter()
                    .map(|p| [p[0] + next() * 0.05, p[1] + next() * 0.05, p[2] + next() * 0.05])
                    .collect()
            })
            .collect();
        MaterializedTrajectory::from_frames(frames)
    }

    #[test]
    fn chunk_bounds_cover_every_frame_exactly_once() {
        for f in 1..40 {
            for k in 1..=f {
                let bounds = chunk_bounds(f, k);
                let mut covered = vec![false; f];
                for (start, end) in bounds {
                    for i in start..end {
                        assert!(!covered[i], "frame {i} covered twice for f={f} k={k}");
                        covered[i] = true;
                    }
                }
                assert!(covered.iter().all(|&c| c), "f={f} k={k} left a gap");
            }
        }
    }

    #[test]
    fn parallel_matches_sequential_within_tolerance() {
        let trj = cluster(12, 200, 17);
        let sequential = trajectory_scalar(&trj).unwrap();
        for k in [1, 2, 3, 5, 8] {
            let parallel = trajectory_scalar_parallel(&trj, k).unwrap();
            let rel_err = (sequential - parallel).abs() / sequential.abs();
            assert!(
                rel_err < k as f32 * 1e-5,
                "k={k} rel_err={rel_err} seq={sequential} par={parallel}"
            );
        }
    }

    #[test]
    fn single_chunk_matches_sequential_exactly() {
        let trj = cluster(10, 50, 3);
        let sequential = trajectory_scalar(&trj).unwrap();
        let parallel = trajectory_scalar_parallel(&trj, 1).unwrap();
        assert_eq!(sequential, parallel);
    }
}
