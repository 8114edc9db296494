//! Cross-module invariants exercised against the public API only (no `pub(crate)`
//! helpers), complementing the inline `#[cfg(test)]` unit tests in `engine.rs` and
//! `parallel.rs`.

use lindemann_core::engine;
use lindemann_core::frame_source::{FrameSource, MaterializedTrajectory};
use lindemann_core::parallel::trajectory_scalar_parallel;
use lindemann_core::Position;

fn jittered_lattice(num_atoms: usize, num_frames: usize, seed: u64) -> MaterializedTrajectory {
    let mut state = seed.max(1);
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % 1000) as f32 / 1000.0 - 0.5
    };
    let base: Vec<Position> = (0..num_atoms)
        .map(|k| [(k % 5) as f32, (k / 5 % 5) as f32, (k / 25) as f32])
        .collect();
    let frames = (0..num_frames)
        .map(|_| {
            base.iter()
                .map(|p| [p[0] + next() * 0.04, p[1] + next() * 0.04, p[2] + next() * 0.04])
                .collect()
        })
        .collect();
    MaterializedTrajectory::from_frames(frames)
}

#[test]
fn single_frame_degeneracy() {
    let trj = jittered_lattice(12, 1, 99);
    assert_eq!(engine::trajectory_scalar(&trj).unwrap(), 0.0);
    assert_eq!(engine::per_frame(&trj).unwrap(), vec![0.0]);
    assert!(engine::per_atom_per_frame(&trj).unwrap()[0].iter().all(|&v| v == 0.0));
}

#[test]
fn prefix_consistency_holds_across_many_frame_counts() {
    let trj = jittered_lattice(9, 60, 4242);
    let frames = engine::per_frame(&trj).unwrap();
    let scalar = engine::trajectory_scalar(&trj).unwrap();
    let rel_err = (frames[59] - scalar).abs() / scalar.abs();
    assert!(rel_err < 1e-6);
}

#[test]
fn permutation_of_atoms_leaves_scalar_unchanged() {
    let trj = jittered_lattice(11, 30, 7);
    let scalar = engine::trajectory_scalar(&trj).unwrap();

    let permuted_frames: Vec<Vec<Position>> = (0..trj.num_frames())
        .map(|f| {
            let mut buf = vec![Position::default(); trj.num_atoms()];
            trj.frame_into(f, &mut buf);
            // Rotate by one: a permutation distinct from a simple reversal.
            buf.rotate_left(1);
            buf
        })
        .collect();
    let permuted = MaterializedTrajectory::from_frames(permuted_frames);
    let permuted_scalar = engine::trajectory_scalar(&permuted).unwrap();
    assert!((scalar - permuted_scalar).abs() < 1e-5);
}

#[test]
fn parallel_reducer_agrees_with_sequential_driver() {
    let trj = jittered_lattice(14, 150, 5150);
    let sequential = engine::trajectory_scalar(&trj).unwrap();
    for chunks in [1, 4, 7] {
        let parallel = trajectory_scalar_parallel(&trj, chunks).unwrap();
        let rel_err = (sequential - parallel).abs() / sequential.abs();
        assert!(rel_err < chunks as f32 * 1e-5, "chunks={chunks} rel_err={rel_err}");
    }
}

#[test]
fn atom_mean_matches_per_frame_scalar() {
    let trj = jittered_lattice(10, 20, 31337);
    let per_frame = engine::per_frame(&trj).unwrap();
    let per_atom = engine::per_atom_per_frame(&trj).unwrap();
    for f in 1..20 {
        let atom_mean: f32 = per_atom[f].iter().sum::<f32>() / per_atom[f].len() as f32;
        let rel_err = (atom_mean - per_frame[f]).abs() / per_frame[f].abs().max(1e-12);
        assert!(rel_err < 1e-5, "frame {f} rel_err={rel_err}");
    }
}
