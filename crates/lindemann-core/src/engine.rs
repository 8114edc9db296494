//! Trajectory engine (component D): drives the pair indexer, distance kernel, and
//! Welford accumulator over every frame a [`FrameSource`] delivers, and aggregates
//! the result into one of the three output shapes spec.md §4.4 names.
//!
//! There is exactly one canonical implementation of each aggregation, not one per
//! "online"/"materialized" variant (spec.md §9: the historical Python source carried
//! several duplicated revisions that all converged on the same algorithm). The
//! memory-reduced ("online") behavior spec.md §4.4.D.4 asks for falls out for free:
//! [`drive`] only ever pulls one frame at a time through [`FrameSource::frame_into`],
//! so whether a computation is memory-reduced is entirely a property of which
//! `FrameSource` the caller passes in, not of which function they call.

use crate::distance::{self, Position};
use crate::error::{Error, Result};
use crate::frame_source::FrameSource;
use crate::pair_index::pair_count;
use crate::welford::WelfordState;

/// Mean, over all pairs, of `sqrt(m2[p] / divisor) / mean[p]`, excluding pairs whose
/// mean distance is (accidentally) zero and any resulting NaNs — spec.md §4.4.D.1's
/// masking rule.
pub(crate) fn mean_sigma_over_mu(state: &WelfordState, divisor: usize) -> f32 {
    let divisor = divisor as f32;
    let mean = state.mean();
    let m2 = state.m2();

    let mut sum = 0.0_f32;
    let mut count = 0usize;
    for p in 0..mean.len() {
        if mean[p] == 0.0 {
            continue;
        }
        let value = (m2[p] / divisor).sqrt() / mean[p];
        if value.is_nan() {
            continue;
        }
        sum += value;
        count += 1;
    }
    if count == 0 {
        f32::NAN
    } else {
        sum / count as f32
    }
}

/// Mean of `row`'s entries, excluding zeros and NaNs (spec.md §4.4.D.3, §9).
///
/// A row with nothing left after masking degenerates to `0.0`, not `NaN` — this is
/// exactly what happens for every atom when `F == 1` (every `m2` is still `0.0`, so
/// every entry is `0.0` and gets excluded), and spec.md §8's single-frame degeneracy
/// property requires that case to read as `0.0`, not a poisoned `NaN`.
fn row_mean_excluding_zero_and_nan(row: &[f32]) -> f32 {
    let mut sum = 0.0_f32;
    let mut count = 0usize;
    for &v in row {
        if v != 0.0 && !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

fn validate<S: FrameSource + ?Sized>(source: &S) -> Result<(usize, usize)> {
    let n = source.num_atoms();
    if n < 2 {
        return Err(Error::InsufficientAtoms(n));
    }
    let f_total = source.num_frames();
    if f_total == 0 {
        return Err(Error::EmptyTrajectory);
    }
    Ok((f_total, n))
}

/// Drives the Welford accumulator over `[start, end)` of `source`'s frames, calling
/// `per_frame` after every successful observation with the current divisor
/// (`frame - start + 1`, i.e. local to the range) and the running [`WelfordState`].
///
/// Used directly by the sequential drivers (`start = 0`, `end = num_frames()`) and
/// by the parallel reducer's per-chunk workers (component E).
pub(crate) fn drive_range<S: FrameSource + ?Sized>(
    source: &S,
    start: usize,
    end: usize,
    mut per_frame: impl FnMut(&WelfordState, usize),
) -> WelfordState {
    let n = source.num_atoms();
    let p = pair_count(n);
    let mut welford = WelfordState::init(p);
    let mut positions = vec![Position::default(); n];
    let mut dist = vec![0.0_f32; p];

    for frame in start..end {
        if !source.frame_into(frame, &mut positions) {
            tracing::warn!(
                "{}",
                Error::FrameCountMismatch {
                    advertised: end - start,
                    yielded: frame - start,
                }
            );
            break;
        }
        distance::pairwise_into(&positions, &mut dist);
        let local_count = frame - start + 1;
        welford.observe(&dist, local_count);
        per_frame(&welford, local_count);
    }
    welford
}

/// D.1 — per-trajectory scalar: the unweighted mean over all pairs of
/// `sigma_ij / mu_ij`, accumulated over every frame `source` delivers.
#[tracing::instrument(skip(source))]
pub fn trajectory_scalar<S: FrameSource + ?Sized>(source: &S) -> Result<f32> {
    let (f_total, _n) = validate(source)?;
    let welford = drive_range(source, 0, f_total, |_, _| {});
    Ok(mean_sigma_over_mu(&welford, welford.count()))
}

/// D.2 — per-frame stream: after every frame `f`, the trajectory-scalar aggregate
/// computed as if the trajectory had stopped at `f` (a strict prefix statistic:
/// `y[F-1]` equals [`trajectory_scalar`]'s result).
#[tracing::instrument(skip(source))]
pub fn per_frame(source: &(impl FrameSource + ?Sized)) -> Result<Vec<f32>> {
    let (f_total, _n) = validate(source)?;
    let mut out = Vec::with_capacity(f_total);
    drive_range(source, 0, f_total, |state, divisor| {
        out.push(mean_sigma_over_mu(state, divisor));
    });
    Ok(out)
}

/// D.3 — per-atom-per-frame: an `F x N` matrix whose row `f`, column `i` is atom
/// `i`'s Lindemann contribution as observed through frame `f`.
#[tracing::instrument(skip(source))]
pub fn per_atom_per_frame(source: &(impl FrameSource + ?Sized)) -> Result<Vec<Vec<f32>>> {
    let (f_total, n) = validate(source)?;

    let mut mean_matrix = vec![0.0_f32; n * n];
    let mut var_matrix = vec![0.0_f32; n * n];
    let mut row = vec![0.0_f32; n];
    let mut out = Vec::with_capacity(f_total);

    drive_range(source, 0, f_total, |state, divisor| {
        let mean = state.mean();
        let m2 = state.m2();

        // Step 1: expand the pair-indexed state into symmetric N x N matrices.
        let mut p = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                mean_matrix[i * n + j] = mean[p];
                mean_matrix[j * n + i] = mean[p];
                var_matrix[i * n + j] = m2[p];
                var_matrix[j * n + i] = m2[p];
                p += 1;
            }
        }
        // Step 2: diagonal guard against divide-by-zero.
        for i in 0..n {
            mean_matrix[i * n + i] = 1.0;
        }

        let divisor_f = divisor as f32;
        let mut row_means = vec![0.0_f32; n];
        for i in 0..n {
            // Step 3: L[i, j] = sqrt(var[i,j] / divisor) / mean[i,j].
            for j in 0..n {
                let std = (var_matrix[i * n + j] / divisor_f).sqrt();
                row[j] = std / mean_matrix[i * n + j];
            }
            // Step 4-5: row mean excluding the diagonal and accidental zeros, NaNs skipped.
            row_means[i] = row_mean_excluding_zero_and_nan(&row);
        }
        out.push(row_means);
    });

    Ok(out)
}
