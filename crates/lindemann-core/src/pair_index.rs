//! Flat enumeration of unordered atom pairs `(i, j)`, `i < j`.
//!
//! The engine's hot loop walks pairs with a running counter that agrees with
//! [`index`] by construction; [`index`] itself exists for callers (tests, the
//! per-atom aggregator) that need to look a specific pair up out of order.

/// Number of unordered pairs among `n` atoms.
#[inline]
#[must_use]
pub const fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Flat index of pair `(i, j)` with `i < j`, in row-major upper-triangular order.
///
/// The exact formula is an implementation detail (spec: "not part of the external
/// contract"), but it is consistent within a run and agrees with the running counter
/// the engine increments while iterating `i`, then `j` from `i + 1`.
///
/// # Panics
///
/// Panics in debug builds if `i >= j` or `j >= n`.
#[inline]
#[must_use]
pub const fn index(i: usize, j: usize, n: usize) -> usize {
    debug_assert!(i < j && j < n, "pair index out of range");
    i * (2 * n - i - 1) / 2 + (j - i - 1)
}
