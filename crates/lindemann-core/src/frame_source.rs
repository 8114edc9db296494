//! Frame source adapter (component G, spec.md §6).
//!
//! The engine negotiates with whatever delivers positions through a single trait:
//! implementors either hold the whole `(F, N, 3)` tensor in memory (and can hand out
//! a borrowed slice via [`FrameSource::as_materialized`]) or pull one frame at a time
//! from some other backing store (a file, a network source, an external pipeline).
//! The trajectory engine (component D) only ever calls [`FrameSource::frame_into`];
//! `as_materialized` is purely an optimization hook callers may ignore.

use crate::distance::Position;

/// Source of one trajectory's atomic positions, frame by frame.
///
/// Implementors must keep atom ordering stable across frames (spec.md §3) — the
/// engine identifies pair `(i, j)` across time by index, not by any atom identity
/// carried in the source.
pub trait FrameSource: Sync {
    /// Number of frames this source advertises.
    fn num_frames(&self) -> usize;

    /// Number of atoms per frame.
    fn num_atoms(&self) -> usize;

    /// Fills `buf` (length `num_atoms()`) with frame `index`'s positions.
    ///
    /// Returns `false` if the source cannot produce this frame even though it
    /// advertised enough frames via [`FrameSource::num_frames`] — the caller treats
    /// this as [`crate::error::Error::FrameCountMismatch`] and stops early.
    fn frame_into(&self, index: usize, buf: &mut [Position]) -> bool;

    /// Borrows the full `(F, N)` flattened position tensor, if this source already
    /// holds it in memory. Returning `None` is always correct; it only disables an
    /// optimization some callers may use.
    fn as_materialized(&self) -> Option<&[Position]> {
        None
    }
}

/// A frame source that holds the complete `(F, N, 3)` tensor in memory.
///
/// This is the "materialized" half of spec.md §6's negotiation: cheap to read
/// concurrently from disjoint frame ranges (needed by the parallel reducer), at the
/// cost of `F * N * 3 * 4` bytes resident for the lifetime of the computation.
#[derive(Debug, Clone)]
pub struct MaterializedTrajectory {
    num_atoms: usize,
    // Flat, frame-major: positions[frame * num_atoms + atom].
    positions: Vec<Position>,
}

impl MaterializedTrajectory {
    /// Builds a materialized trajectory from a flat, frame-major position buffer.
    ///
    /// # Panics
    ///
    /// Panics if `flat.len()` is not a multiple of `num_atoms` (every frame must
    /// carry the same atom count, spec.md §3).
    #[must_use]
    pub fn from_flat(num_atoms: usize, flat: Vec<Position>) -> Self {
        assert!(
            num_atoms == 0 || flat.len() % num_atoms == 0,
            "flat position buffer length {} is not a multiple of num_atoms {num_atoms}",
            flat.len(),
        );
        Self {
            num_atoms,
            positions: flat,
        }
    }

    /// Builds a materialized trajectory from one `Vec<Position>` per frame.
    ///
    /// # Panics
    ///
    /// Panics if frames have differing atom counts.
    #[must_use]
    pub fn from_frames(frames: Vec<Vec<Position>>) -> Self {
        let num_atoms = frames.first().map_or(0, Vec::len);
        assert!(
            frames.iter().all(|f| f.len() == num_atoms),
            "every frame must have the same number of atoms"
        );
        let positions = frames.into_iter().flatten().collect();
        Self {
            num_atoms,
            positions,
        }
    }
}

impl FrameSource for MaterializedTrajectory {
    fn num_frames(&self) -> usize {
        if self.num_atoms == 0 {
            0
        } else {
            self.positions.len() / self.num_atoms
        }
    }

    fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    fn frame_into(&self, index: usize, buf: &mut [Position]) -> bool {
        let start = index * self.num_atoms;
        let end = start + self.num_atoms;
        match self.positions.get(start..end) {
            Some(slice) => {
                buf.copy_from_slice(slice);
                true
            }
            None => false,
        }
    }

    fn as_materialized(&self) -> Option<&[Position]> {
        Some(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn materialized_round_trips_frames() {
        let frames = vec![
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            vec![[0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
        ];
        let trj = MaterializedTrajectory::from_frames(frames.clone());
        assert_eq!(trj.num_frames(), 2);
        assert_eq!(trj.num_atoms(), 2);

        let mut buf = vec![[0.0; 3]; 2];
        assert!(trj.frame_into(1, &mut buf));
        assert_eq!(buf, frames[1]);
    }

    #[test]
    fn frame_into_reports_dry_source() {
        let trj = MaterializedTrajectory::from_frames(vec![vec![[0.0, 0.0, 0.0]]]);
        let mut buf = vec![[0.0; 3]; 1];
        assert!(!trj.frame_into(5, &mut buf));
    }
}
