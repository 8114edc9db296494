//! Streaming Welford accumulator over pairwise distances (component B).
//!
//! Holds `(n, mean, m2)` for every pair and updates in place, one frame at a time.
//! The two-step update in [`WelfordState::observe`] must be reproduced exactly as
//! written (recompute `delta` *after* updating the mean) — the naive
//! `delta * delta` form is numerically different and fails the prefix-consistency
//! property under accumulated rounding.

/// Running mean/variance state for `pair_count(n)` pairs.
///
/// Invariants (spec.md §3): `n >= 0`; if `n == 0` then every `mean`/`m2` entry is
/// `0.0`; `m2[p] >= 0.0` for all `p`; after observing frames `f_1..f_n`, `mean[p]`
/// is their arithmetic mean and `m2[p]` is the sum of squared deviations from it.
#[derive(Debug, Clone)]
pub struct WelfordState {
    n: usize,
    mean: Vec<f32>,
    m2: Vec<f32>,
}

impl WelfordState {
    /// Creates a zeroed accumulator for `p` pairs.
    #[must_use]
    pub fn init(p: usize) -> Self {
        Self {
            n: 0,
            mean: vec![0.0; p],
            m2: vec![0.0; p],
        }
    }

    /// Number of pairs this state tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Whether this state tracks zero pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Frames observed so far.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.n
    }

    /// Running means, one per pair.
    #[must_use]
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Running sums of squared deviations, one per pair.
    #[must_use]
    pub fn m2(&self) -> &[f32] {
        &self.m2
    }

    /// Folds one frame's pair-distance vector into the running statistics.
    ///
    /// `dist` must have the same length as this state. `n_after` must equal
    /// `self.count() + 1` — the engine always passes its own post-observation
    /// frame count, never a foreign one (spec.md §4.2).
    #[inline]
    pub fn observe(&mut self, dist: &[f32], n_after: usize) {
        debug_assert_eq!(dist.len(), self.mean.len());
        debug_assert_eq!(n_after, self.n + 1);

        let n_after = n_after as f32;
        for p in 0..self.mean.len() {
            let delta = dist[p] - self.mean[p];
            self.mean[p] += delta / n_after;
            let delta2 = dist[p] - self.mean[p];
            self.m2[p] += delta * delta2;
        }
        self.n += 1;
    }

    /// Chan/Welford parallel combination of two independent accumulators.
    ///
    /// Commutative and associative up to floating-point rounding; callers that need
    /// a deterministic result across many states must merge left-to-right (the
    /// parallel reducer does).
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        debug_assert_eq!(self.mean.len(), other.mean.len());

        if self.n == 0 {
            return other.clone();
        }
        if other.n == 0 {
            return self.clone();
        }

        let n_a = self.n as f32;
        let n_b = other.n as f32;
        let n_ab = n_a + n_b;

        let mut mean = vec![0.0; self.mean.len()];
        let mut m2 = vec![0.0; self.mean.len()];
        for p in 0..self.mean.len() {
            let delta = other.mean[p] - self.mean[p];
            mean[p] = self.mean[p] + delta * n_b / n_ab;
            m2[p] = self.m2[p] + other.m2[p] + delta * delta * n_a * n_b / n_ab;
        }

        Self {
            n: self.n + other.n,
            mean,
            m2,
        }
    }

    /// Elementwise `sqrt(m2 / divisor)`.
    ///
    /// The divisor must be the accumulator's actual `n` at the moment of the call
    /// (spec.md §4.2) — the engine never finalizes with a foreign frame count.
    #[must_use]
    pub fn finalize_std(&self, divisor: usize) -> Vec<f32> {
        let divisor = divisor as f32;
        self.m2.iter().map(|&m2| (m2 / divisor).sqrt()).collect()
    }
}
