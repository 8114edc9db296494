//! Output sinks (spec.md §6): everything the CLI does with a computed result once the
//! engine has produced it — write numbers to a stream, render a PDF scatter plot, or
//! decorate a copy of the input trajectory with a per-atom Lindemann column.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use plotters::prelude::*;
use plotters_cairo::CairoBackend;

/// Errors raised while rendering output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Writing to the destination stream or file failed.
    #[error("I/O error writing output: {0}")]
    Io(#[from] io::Error),

    /// The plotting backend failed to draw or flush the chart.
    #[error("failed to render plot: {0}")]
    Plot(String),

    /// The decorated-trajectory sink could not make sense of the source dump while
    /// re-streaming it (a second, independent pass from [`crate::lammps`]'s reader).
    #[error("malformed trajectory while decorating: {0}")]
    Malformed(String),
}

type Result<T> = std::result::Result<T, SinkError>;

/// Writes one scalar per line, plain ASCII, the way the original implementation's
/// `numpy.savetxt` does for the `-t`/`-ot` scalar modes.
pub fn write_scalar(writer: &mut impl Write, value: f32) -> Result<()> {
    writeln!(writer, "{value}")?;
    Ok(())
}

/// Writes one value per line (the `-f`/`-of` per-frame modes).
pub fn write_series(writer: &mut impl Write, values: &[f32]) -> Result<()> {
    for value in values {
        writeln!(writer, "{value}")?;
    }
    Ok(())
}

/// Writes one whitespace-separated row per frame, one column per atom (the `-a`/`-oa`
/// per-atom-per-frame modes).
pub fn write_matrix(writer: &mut impl Write, rows: &[Vec<f32>]) -> Result<()> {
    for row in rows {
        let mut first = true;
        for value in row {
            if !first {
                write!(writer, " ")?;
            }
            write!(writer, "{value}")?;
            first = false;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Renders the per-frame series as a PDF scatter plot (the `-p` mode), via
/// `plotters` drawing onto a `cairo` PDF surface — the pack carries no crate that
/// rasterizes charts straight to PDF, so this pairs `plotters`'s drawing API with
/// `plotters-cairo`'s backend bridge and `cairo-rs`'s `PdfSurface`.
pub fn write_plot_pdf(path: &Path, values: &[f32]) -> Result<()> {
    let width = 960;
    let height = 540;
    let surface = cairo::PdfSurface::new(f64::from(width), f64::from(height), path)
        .map_err(|e| SinkError::Plot(format!("could not create PDF surface: {e}")))?;
    let cr = cairo::Context::new(&surface).map_err(|e| SinkError::Plot(e.to_string()))?;

    {
        let backend = CairoBackend::new(&cr, (width, height))
            .map_err(|e| SinkError::Plot(format!("{e:?}")))?;
        let root = backend.into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| SinkError::Plot(format!("{e:?}")))?;

        let y_max = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f32::MIN, f32::max)
            .max(1e-6);

        let mut chart = ChartBuilder::on(&root)
            .caption("Lindemann index per frame", ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f32..values.len().max(1) as f32, 0f32..y_max * 1.1)
            .map_err(|e| SinkError::Plot(format!("{e:?}")))?;

        chart
            .configure_mesh()
            .x_desc("Frames")
            .y_desc("Lindemann index")
            .draw()
            .map_err(|e| SinkError::Plot(format!("{e:?}")))?;

        chart
            .draw_series(
                values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, &v)| Circle::new((i as f32, v), 2, BLUE.filled())),
            )
            .map_err(|e| SinkError::Plot(format!("{e:?}")))?;

        root.present().map_err(|e| SinkError::Plot(format!("{e:?}")))?;
    }
    surface
        .finish_output_stream()
        .map_err(|e| SinkError::Plot(format!("could not finalize PDF: {e}")))?;
    Ok(())
}

/// Copies `input` to `output`, appending a `lindemann` column to every atom line.
///
/// `per_atom_per_frame` is one row per frame, one column per *selected* atom, sorted
/// ascending by atom id — exactly the shape `engine::per_atom_per_frame` returns when
/// driven over the same selection the original file was read with. Unselected atoms
/// are written back with a `0` placeholder column, never dropped, so the decorated
/// file keeps the source trajectory's full atom set. This streams frame by frame
/// rather than the original implementation's approach of writing one temp file per
/// frame and concatenating them afterward.
pub fn decorate_trajectory(
    input: &Path,
    output: &Path,
    per_atom_per_frame: &[Vec<f32>],
) -> Result<()> {
    let in_file = std::fs::File::open(input)?;
    let mut reader = BufReader::new(in_file);
    let out_file = std::fs::File::create(output)?;
    let mut writer = io::BufWriter::new(out_file);

    let mut line = String::new();
    let mut frame_index = 0usize;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        if line.trim_end() != "ITEM: TIMESTEP" {
            return Err(SinkError::Malformed(format!(
                "expected 'ITEM: TIMESTEP', found '{}'",
                line.trim_end()
            )));
        }
        writer.write_all(line.as_bytes())?;
        copy_line(&mut reader, &mut writer)?; // timestep value

        copy_line(&mut reader, &mut writer)?; // "ITEM: NUMBER OF ATOMS"
        let atoms_line = copy_line(&mut reader, &mut writer)?;
        let num_atoms: usize = atoms_line
            .trim()
            .parse()
            .map_err(|_| SinkError::Malformed("non-numeric atom count".into()))?;

        copy_line(&mut reader, &mut writer)?; // "ITEM: BOX BOUNDS ..."
        for _ in 0..3 {
            copy_line(&mut reader, &mut writer)?;
        }

        let header = read_line(&mut reader)?;
        if !header.starts_with("ITEM: ATOMS") {
            return Err(SinkError::Malformed("expected 'ITEM: ATOMS ...'".into()));
        }
        let columns: Vec<&str> = header.trim_end().split_whitespace().skip(2).collect();
        let id_col = columns
            .iter()
            .position(|&c| c == "id")
            .ok_or_else(|| SinkError::Malformed("dump is missing 'id' column".into()))?;
        writeln!(writer, "{} lindemann", header.trim_end())?;

        let scalars = per_atom_per_frame.get(frame_index);
        let mut atom_lines = Vec::with_capacity(num_atoms);
        for _ in 0..num_atoms {
            atom_lines.push(read_line(&mut reader)?);
        }

        let ids: Vec<i64> = atom_lines
            .iter()
            .map(|l| {
                l.trim_end()
                    .split_whitespace()
                    .nth(id_col)
                    .and_then(|v| v.parse::<i64>().ok())
                    .ok_or_else(|| SinkError::Malformed("non-numeric atom id".into()))
            })
            .collect::<Result<_>>()?;
        let mut sorted_ids = ids.clone();
        sorted_ids.sort_unstable();

        let id_to_value: HashMap<i64, f32> = match scalars {
            Some(values) => sorted_ids.iter().copied().zip(values.iter().copied()).collect(),
            None => HashMap::new(),
        };

        for (line, id) in atom_lines.iter().zip(ids.iter()) {
            let value = id_to_value.get(id).copied().unwrap_or(0.0);
            writeln!(writer, "{} {value}", line.trim_end())?;
        }

        frame_index += 1;
    }

    writer.flush()?;
    Ok(())
}

fn read_line(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(SinkError::Malformed("file ended unexpectedly".into()));
    }
    Ok(line)
}

fn copy_line(reader: &mut impl BufRead, writer: &mut impl Write) -> Result<String> {
    let line = read_line(reader)?;
    writer.write_all(line.as_bytes())?;
    Ok(line)
}
