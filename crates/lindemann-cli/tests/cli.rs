//! Integration tests driving the compiled `lindemann` binary end to end.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_dump(path: &std::path::Path, frames: usize, atoms: usize) {
    let mut file = std::fs::File::create(path).unwrap();
    for t in 0..frames {
        writeln!(file, "ITEM: TIMESTEP").unwrap();
        writeln!(file, "{t}").unwrap();
        writeln!(file, "ITEM: NUMBER OF ATOMS").unwrap();
        writeln!(file, "{atoms}").unwrap();
        writeln!(file, "ITEM: BOX BOUNDS pp pp pp").unwrap();
        writeln!(file, "0.0 10.0").unwrap();
        writeln!(file, "0.0 10.0").unwrap();
        writeln!(file, "0.0 10.0").unwrap();
        writeln!(file, "ITEM: ATOMS id type x y z").unwrap();
        for a in 0..atoms {
            let jitter = (t as f32 * 0.01 + a as f32 * 0.003).sin() * 0.02;
            writeln!(
                file,
                "{} 1 {} {} {}",
                a + 1,
                (a % 4) as f32 + jitter,
                (a / 4) as f32 + jitter,
                jitter
            )
            .unwrap();
        }
    }
}

#[test]
fn scalar_mode_prints_one_number() {
    let dir = tempfile::tempdir().unwrap();
    let trj = dir.path().join("trj.lammpstrj");
    write_dump(&trj, 5, 8);

    Command::cargo_bin("lindemann")
        .unwrap()
        .arg(&trj)
        .arg("-t")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^-?\d+(\.\d+)?\n$").unwrap());
}

#[test]
fn default_mode_matches_explicit_scalar_flag() {
    let dir = tempfile::tempdir().unwrap();
    let trj = dir.path().join("trj.lammpstrj");
    write_dump(&trj, 5, 8);

    let default_out = Command::cargo_bin("lindemann").unwrap().arg(&trj).output().unwrap();
    let explicit_out = Command::cargo_bin("lindemann").unwrap().arg(&trj).arg("-t").output().unwrap();

    assert_eq!(default_out.stdout, explicit_out.stdout);
}

#[test]
fn multi_input_rejects_non_scalar_modes() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.lammpstrj");
    let b = dir.path().join("b.lammpstrj");
    write_dump(&a, 3, 6);
    write_dump(&b, 3, 6);

    Command::cargo_bin("lindemann")
        .unwrap()
        .arg(&a)
        .arg(&b)
        .arg("-f")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "multiprocessing is implemented only for the -t flag",
        ));
}

#[test]
fn multi_input_scalar_emits_one_line_per_file_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.lammpstrj");
    let b = dir.path().join("b.lammpstrj");
    write_dump(&a, 4, 6);
    write_dump(&b, 4, 6);

    let output = Command::cargo_bin("lindemann")
        .unwrap()
        .arg(&a)
        .arg(&b)
        .arg("-t")
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn per_frame_mode_writes_default_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let trj = dir.path().join("trj.lammpstrj");
    write_dump(&trj, 6, 8);

    Command::cargo_bin("lindemann")
        .unwrap()
        .current_dir(dir.path())
        .arg(&trj)
        .arg("-f")
        .assert()
        .success();

    let out = dir.path().join("lindemann_index_per_frame.txt");
    let contents = std::fs::read_to_string(out).unwrap();
    assert_eq!(contents.lines().count(), 6);
}

#[test]
fn missing_trajectory_exits_nonzero() {
    Command::cargo_bin("lindemann")
        .unwrap()
        .arg("/no/such/file.lammpstrj")
        .arg("-t")
        .assert()
        .failure();
}

#[test]
fn memory_flag_prints_estimate_and_exits() {
    let dir = tempfile::tempdir().unwrap();
    let trj = dir.path().join("trj.lammpstrj");
    write_dump(&trj, 10, 20);

    Command::cargo_bin("lindemann")
        .unwrap()
        .arg(&trj)
        .arg("-m")
        .assert()
        .success()
        .stdout(predicate::str::contains("10 frames, 20 atoms"));
}
