//! LAMMPS `dump` trajectory reader.
//!
//! The concrete instance of the frame-source interface (spec.md §6): parses the
//! text dump format LAMMPS writes, in the same spirit as the original Python
//! implementation's OVITO-backed `read.frames` (stable sort by atom id, filter to a
//! selectable set of particle types — the original hardcodes `{1, 2, 3}`).
//!
//! Two adapters are provided: [`read_materialized`] loads the whole `(F, N, 3)`
//! tensor into one [`MaterializedTrajectory`], and [`LammpsStreamSource`] parses one
//! frame at a time from disk, for the memory-reduced ("online") CLI modes.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use lindemann_core::distance::Position;
use lindemann_core::frame_source::{FrameSource, MaterializedTrajectory};

/// Particle types kept when no explicit selection is given, matching the original
/// implementation's hardcoded `{1, 2, 3}`.
pub const DEFAULT_SELECTED_TYPES: [i64; 3] = [1, 2, 3];

/// Errors raised while reading a LAMMPS dump trajectory.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The file could not be opened at all.
    #[error("trajectory file not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred after the file was successfully opened.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// Path being read when the error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file's contents did not match the expected dump structure.
    #[error("malformed LAMMPS dump at {path}: {reason}")]
    Malformed {
        /// Path of the offending file.
        path: PathBuf,
        /// Human-readable description of what was expected.
        reason: String,
    },
}

type Result<T> = std::result::Result<T, ReadError>;

fn io_err(path: &Path, source: std::io::Error) -> ReadError {
    ReadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn malformed(path: &Path, reason: impl Into<String>) -> ReadError {
    ReadError::Malformed {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn selection_set(selected_types: Option<&[i64]>) -> HashSet<i64> {
    match selected_types {
        Some(types) => types.iter().copied().collect(),
        None => DEFAULT_SELECTED_TYPES.iter().copied().collect(),
    }
}

fn read_line_into(reader: &mut impl BufRead, line: &mut String, path: &Path) -> Result<usize> {
    line.clear();
    reader.read_line(line).map_err(|e| io_err(path, e))
}

/// Reads one frame starting at the reader's current position. Returns `Ok(None)` at
/// a clean EOF (no more "ITEM: TIMESTEP" headers), atoms sorted by id ascending and
/// filtered to `selected`.
fn read_one_frame(
    reader: &mut impl BufRead,
    path: &Path,
    selected: &HashSet<i64>,
) -> Result<Option<Vec<Position>>> {
    let mut line = String::new();

    loop {
        if read_line_into(reader, &mut line, path)? == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            break;
        }
    }
    if line.trim_end() != "ITEM: TIMESTEP" {
        return Err(malformed(
            path,
            format!("expected 'ITEM: TIMESTEP', found '{}'", line.trim_end()),
        ));
    }
    read_line_into(reader, &mut line, path)?; // timestep value, unused

    read_line_into(reader, &mut line, path)?;
    if line.trim_end() != "ITEM: NUMBER OF ATOMS" {
        return Err(malformed(path, "expected 'ITEM: NUMBER OF ATOMS'"));
    }
    read_line_into(reader, &mut line, path)?;
    let num_atoms: usize = line
        .trim()
        .parse()
        .map_err(|_| malformed(path, "non-numeric atom count"))?;

    read_line_into(reader, &mut line, path)?;
    if !line.starts_with("ITEM: BOX BOUNDS") {
        return Err(malformed(path, "expected 'ITEM: BOX BOUNDS ...'"));
    }
    for _ in 0..3 {
        read_line_into(reader, &mut line, path)?;
    }

    read_line_into(reader, &mut line, path)?;
    if !line.starts_with("ITEM: ATOMS") {
        return Err(malformed(path, "expected 'ITEM: ATOMS ...'"));
    }
    let columns: Vec<&str> = line.trim_end().split_whitespace().skip(2).collect();
    let col = |name: &str| {
        columns
            .iter()
            .position(|&c| c == name)
            .ok_or_else(|| malformed(path, format!("dump is missing '{name}' column")))
    };
    let id_col = col("id")?;
    let type_col = col("type")?;
    let x_col = columns
        .iter()
        .position(|&c| c == "x" || c == "xu")
        .ok_or_else(|| malformed(path, "dump is missing 'x'/'xu' column"))?;
    let y_col = columns
        .iter()
        .position(|&c| c == "y" || c == "yu")
        .ok_or_else(|| malformed(path, "dump is missing 'y'/'yu' column"))?;
    let z_col = columns
        .iter()
        .position(|&c| c == "z" || c == "zu")
        .ok_or_else(|| malformed(path, "dump is missing 'z'/'zu' column"))?;

    let mut atoms: Vec<(i64, Position)> = Vec::with_capacity(num_atoms);
    for _ in 0..num_atoms {
        if read_line_into(reader, &mut line, path)? == 0 {
            return Err(malformed(path, "file ended mid-frame"));
        }
        let fields: Vec<&str> = line.trim_end().split_whitespace().collect();
        let get = |idx: usize| {
            fields
                .get(idx)
                .copied()
                .ok_or_else(|| malformed(path, "atom line has too few columns"))
        };
        let id: i64 = get(id_col)?
            .parse()
            .map_err(|_| malformed(path, "non-numeric atom id"))?;
        let atom_type: i64 = get(type_col)?
            .parse()
            .map_err(|_| malformed(path, "non-numeric atom type"))?;
        if !selected.contains(&atom_type) {
            continue;
        }
        let x: f32 = get(x_col)?
            .parse()
            .map_err(|_| malformed(path, "non-numeric x coordinate"))?;
        let y: f32 = get(y_col)?
            .parse()
            .map_err(|_| malformed(path, "non-numeric y coordinate"))?;
        let z: f32 = get(z_col)?
            .parse()
            .map_err(|_| malformed(path, "non-numeric z coordinate"))?;
        atoms.push((id, [x, y, z]));
    }

    atoms.sort_by_key(|(id, _)| *id);
    Ok(Some(atoms.into_iter().map(|(_, p)| p).collect()))
}

/// Reads every frame of `path` into one materialized tensor.
///
/// `selected_types` filters atoms by the dump's `type` column; `None` keeps the
/// original implementation's default, `{1, 2, 3}`.
pub fn read_materialized(
    path: &Path,
    selected_types: Option<&[i64]>,
) -> Result<MaterializedTrajectory> {
    let selected = selection_set(selected_types);
    let file = File::open(path).map_err(|_| ReadError::NotFound(path.to_path_buf()))?;
    let mut reader = BufReader::new(file);

    let mut frames: Vec<Vec<Position>> = Vec::new();
    let mut expected_atoms: Option<usize> = None;

    while let Some(atoms) = read_one_frame(&mut reader, path, &selected)? {
        match expected_atoms {
            Some(expected) if expected != atoms.len() => {
                return Err(malformed(
                    path,
                    format!(
                        "frame {} has {} selected atoms, expected {expected} (atom ordering must be stable)",
                        frames.len(),
                        atoms.len()
                    ),
                ));
            }
            Some(_) => {}
            None => expected_atoms = Some(atoms.len()),
        }
        frames.push(atoms);
    }

    Ok(MaterializedTrajectory::from_frames(frames))
}

/// Streams a LAMMPS dump one frame at a time: a frame-index -> byte-offset table is
/// built once at construction (a single sequential pass with no per-frame position
/// buffer retained), and [`FrameSource::frame_into`] reopens the file and seeks for
/// each call. Cheap to clone (no open file handle is held), which is what lets the
/// parallel reducer (component E) give each chunk its own cursor into the same file.
#[derive(Debug, Clone)]
pub struct LammpsStreamSource {
    path: PathBuf,
    frame_offsets: Vec<u64>,
    num_atoms: usize,
    selected_types: HashSet<i64>,
}

impl LammpsStreamSource {
    /// Scans `path` for frame boundaries and probes the first frame for its atom
    /// count, without materializing the full position tensor.
    pub fn open(path: &Path, selected_types: Option<&[i64]>) -> Result<Self> {
        let selected = selection_set(selected_types);

        let file = File::open(path).map_err(|_| ReadError::NotFound(path.to_path_buf()))?;
        let mut reader = BufReader::new(file);
        let mut offsets = Vec::new();
        let mut byte_pos: u64 = 0;
        let mut line = String::new();
        loop {
            let read = read_line_into(&mut reader, &mut line, path)?;
            if read == 0 {
                break;
            }
            if line.trim_end() == "ITEM: TIMESTEP" {
                offsets.push(byte_pos);
            }
            byte_pos += read as u64;
        }
        if offsets.is_empty() {
            return Err(malformed(path, "no 'ITEM: TIMESTEP' frames found"));
        }

        let mut probe =
            BufReader::new(File::open(path).map_err(|_| ReadError::NotFound(path.to_path_buf()))?);
        probe
            .seek(SeekFrom::Start(offsets[0]))
            .map_err(|e| io_err(path, e))?;
        let first = read_one_frame(&mut probe, path, &selected)?
            .ok_or_else(|| malformed(path, "first frame is empty"))?;

        Ok(Self {
            path: path.to_path_buf(),
            frame_offsets: offsets,
            num_atoms: first.len(),
            selected_types: selected,
        })
    }
}

impl FrameSource for LammpsStreamSource {
    fn num_frames(&self) -> usize {
        self.frame_offsets.len()
    }

    fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    fn frame_into(&self, index: usize, buf: &mut [Position]) -> bool {
        let Some(&offset) = self.frame_offsets.get(index) else {
            return false;
        };
        let Ok(file) = File::open(&self.path) else {
            return false;
        };
        let mut reader = BufReader::new(file);
        if reader.seek(SeekFrom::Start(offset)).is_err() {
            return false;
        }
        match read_one_frame(&mut reader, &self.path, &self.selected_types) {
            Ok(Some(atoms)) if atoms.len() == buf.len() => {
                buf.copy_from_slice(&atoms);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_dump(frames: &[Vec<(i64, i64, Position)>]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for (t, frame) in frames.iter().enumerate() {
            writeln!(file, "ITEM: TIMESTEP").unwrap();
            writeln!(file, "{t}").unwrap();
            writeln!(file, "ITEM: NUMBER OF ATOMS").unwrap();
            writeln!(file, "{}", frame.len()).unwrap();
            writeln!(file, "ITEM: BOX BOUNDS pp pp pp").unwrap();
            writeln!(file, "0.0 10.0").unwrap();
            writeln!(file, "0.0 10.0").unwrap();
            writeln!(file, "0.0 10.0").unwrap();
            writeln!(file, "ITEM: ATOMS id type x y z").unwrap();
            for (id, typ, pos) in frame {
                writeln!(file, "{id} {typ} {} {} {}", pos[0], pos[1], pos[2]).unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_materialized_and_sorts_by_id() {
        let frames = vec![vec![
            (2, 1, [1.0, 0.0, 0.0]),
            (1, 1, [0.0, 0.0, 0.0]),
        ]];
        let file = write_dump(&frames);
        let trj = read_materialized(file.path(), None).unwrap();
        assert_eq!(trj.num_frames(), 1);
        assert_eq!(trj.num_atoms(), 2);
        let mut buf = vec![[0.0; 3]; 2];
        trj.frame_into(0, &mut buf);
        assert_eq!(buf[0], [0.0, 0.0, 0.0]); // id 1 sorts first
        assert_eq!(buf[1], [1.0, 0.0, 0.0]); // id 2 sorts second
    }

    #[test]
    fn filters_by_selected_types() {
        let frames = vec![vec![
            (1, 1, [0.0, 0.0, 0.0]),
            (2, 4, [9.0, 9.0, 9.0]), // type 4 excluded by default selection
        ]];
        let file = write_dump(&frames);
        let trj = read_materialized(file.path(), None).unwrap();
        assert_eq!(trj.num_atoms(), 1);
    }

    #[test]
    fn stream_source_matches_materialized() {
        let frames = vec![
            vec![(1, 1, [0.0, 0.0, 0.0]), (2, 1, [1.0, 0.0, 0.0])],
            vec![(1, 1, [0.1, 0.0, 0.0]), (2, 1, [1.1, 0.0, 0.0])],
        ];
        let file = write_dump(&frames);
        let materialized = read_materialized(file.path(), None).unwrap();
        let streamed = LammpsStreamSource::open(file.path(), None).unwrap();

        assert_eq!(materialized.num_frames(), streamed.num_frames());
        assert_eq!(materialized.num_atoms(), streamed.num_atoms());

        let mut a = vec![[0.0; 3]; 2];
        let mut b = vec![[0.0; 3]; 2];
        for f in 0..2 {
            materialized.frame_into(f, &mut a);
            streamed.frame_into(f, &mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_materialized(Path::new("/no/such/trajectory.lammpstrj"), None).unwrap_err();
        assert!(matches!(err, ReadError::NotFound(_)));
    }
}
