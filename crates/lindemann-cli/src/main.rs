//! `lindemann` — command-line front end for the Lindemann index engine.
//!
//! Reads one or more LAMMPS `dump` trajectories, drives `lindemann-core` in one of
//! its output modes, and writes the result to stdout or to a file.

mod error;
mod lammps;
mod sinks;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use error::CliError;
use lindemann_core::config::Settings;
use lindemann_core::engine;
use lindemann_core::frame_source::{FrameSource, MaterializedTrajectory};
use lindemann_core::memory::MemoryEstimate;
use lindemann_core::parallel;

const OUT_PER_FRAME_TXT: &str = "lindemann_index_per_frame.txt";
const OUT_PER_ATOM_TXT: &str = "lindemann_index_per_atom.txt";
const OUT_PLOT_PDF: &str = "lindemann_per_frame.pdf";
const OUT_DECORATED: &str = "lindemann_per_atom.lammpstrj";

/// Lindemann index trajectory analysis engine.
///
/// The `-ot`/`-of`/`-oa`/`-pt`/`-ti` flags from the original flag surface are exposed
/// here as long-only flags (`--ot`, `--of`, `--oa`, `--pt`, `--ti`) since `clap`'s
/// short options are single characters; the single-letter modes (`-t`, `-f`, `-a`,
/// `-p`, `-l`, `-m`, `-v`) keep their original short form.
#[derive(Parser, Debug)]
#[command(name = "lindemann", about, disable_version_flag = true)]
struct Cli {
    /// One or more LAMMPS dump trajectory files.
    trajectories: Vec<PathBuf>,

    /// Trajectory scalar (D.1), materialized driver.
    #[arg(short = 't')]
    scalar: bool,
    /// Per-frame stream (D.2), materialized driver.
    #[arg(short = 'f')]
    per_frame: bool,
    /// Per-atom-per-frame matrix (D.3), materialized driver.
    #[arg(short = 'a')]
    per_atom: bool,
    /// Plot the per-frame stream to a PDF.
    #[arg(short = 'p')]
    plot: bool,
    /// Write a trajectory decorated with a per-atom `lindemann` column.
    #[arg(short = 'l')]
    decorate: bool,

    /// Trajectory scalar, memory-reduced (streaming) driver.
    #[arg(long = "ot")]
    online_scalar: bool,
    /// Per-frame stream, memory-reduced driver.
    #[arg(long = "of")]
    online_per_frame: bool,
    /// Per-atom-per-frame matrix, memory-reduced driver.
    #[arg(long = "oa")]
    online_per_atom: bool,

    /// Trajectory scalar via the parallel chunked reducer (component E).
    #[arg(long = "pt")]
    parallel_scalar: bool,

    /// Time the scalar computation and print elapsed seconds.
    #[arg(long = "ti")]
    timeit: bool,

    /// Print the memory estimate for each input and exit.
    #[arg(short = 'm')]
    memory: bool,

    /// Print the version and exit.
    #[arg(short = 'v')]
    version: bool,

    /// Override the default output filename for file-writing modes.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Particle types kept from the dump's `type` column (default: 1,2,3).
    #[arg(long = "types", value_delimiter = ',')]
    types: Option<Vec<i64>>,

    /// Number of chunks for the parallel reducer (default: number of CPUs).
    #[arg(long = "chunks")]
    chunks: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Scalar { online: bool, parallel: bool },
    PerFrame { online: bool },
    PerAtom { online: bool },
    Plot,
    Decorate,
}

impl Mode {
    fn supports_multi_input(self) -> bool {
        matches!(self, Mode::Scalar { .. })
    }
}

fn resolve_mode(cli: &Cli) -> Result<Mode, CliError> {
    let flags: Vec<(bool, Mode)> = vec![
        (cli.scalar, Mode::Scalar { online: false, parallel: false }),
        (cli.online_scalar, Mode::Scalar { online: true, parallel: false }),
        (cli.parallel_scalar, Mode::Scalar { online: false, parallel: true }),
        (cli.per_frame, Mode::PerFrame { online: false }),
        (cli.online_per_frame, Mode::PerFrame { online: true }),
        (cli.per_atom, Mode::PerAtom { online: false }),
        (cli.online_per_atom, Mode::PerAtom { online: true }),
        (cli.plot, Mode::Plot),
        (cli.decorate, Mode::Decorate),
    ];
    let selected: Vec<Mode> = flags.into_iter().filter(|(set, _)| *set).map(|(_, m)| m).collect();

    match selected.len() {
        0 => Ok(Mode::Scalar { online: false, parallel: false }),
        1 => Ok(selected[0]),
        _ => Err(CliError::UnsupportedMode(
            "at most one of -t/-f/-a/-p/-l/--ot/--of/--oa/--pt may be given".to_string(),
        )),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn require_exists(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CliError::TrajectoryNotFound(path.to_path_buf()))
    }
}

fn load_materialized(path: &Path, types: Option<&[i64]>) -> Result<MaterializedTrajectory, CliError> {
    lammps::read_materialized(path, types).map_err(CliError::from)
}

fn run() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();

    if cli.version {
        println!("lindemann {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    for path in &cli.trajectories {
        require_exists(path)?;
    }

    let settings = Settings::load()?;
    let types = cli.types.as_deref();

    if cli.memory {
        for path in &cli.trajectories {
            print_memory_estimate(path, types)?;
        }
        return Ok(());
    }

    let mode = resolve_mode(&cli)?;

    if cli.trajectories.len() > 1 && !mode.supports_multi_input() {
        println!("multiprocessing is implemented only for the -t flag");
        return Ok(());
    }

    match mode {
        Mode::Scalar { online, parallel } => run_scalar(&cli, online, parallel, types, &settings)?,
        Mode::PerFrame { online } => run_per_frame(&cli, online, types)?,
        Mode::PerAtom { online } => run_per_atom(&cli, online, types)?,
        Mode::Plot => run_plot(&cli, types)?,
        Mode::Decorate => run_decorate(&cli, types)?,
    }
    Ok(())
}

fn single_input<'a>(cli: &'a Cli) -> Result<&'a Path, CliError> {
    cli.trajectories
        .first()
        .map(PathBuf::as_path)
        .ok_or_else(|| CliError::UnsupportedMode("no trajectory given".to_string()))
}

fn scalar_for_path(
    path: &Path,
    online: bool,
    parallel: bool,
    types: Option<&[i64]>,
    chunks: Option<usize>,
) -> Result<f32, CliError> {
    if online {
        let source = lammps::LammpsStreamSource::open(path, types)?;
        if parallel {
            let n = chunks.unwrap_or_else(|| parallel::default_chunk_count(source.num_frames()));
            Ok(parallel::trajectory_scalar_parallel(&source, n)?)
        } else {
            Ok(engine::trajectory_scalar(&source)?)
        }
    } else {
        let source = load_materialized(path, types)?;
        if parallel {
            let n = chunks.unwrap_or_else(|| parallel::default_chunk_count(source.num_frames()));
            Ok(parallel::trajectory_scalar_parallel(&source, n)?)
        } else {
            Ok(engine::trajectory_scalar(&source)?)
        }
    }
}

fn run_scalar(
    cli: &Cli,
    online: bool,
    parallel: bool,
    types: Option<&[i64]>,
    _settings: &Settings,
) -> Result<(), CliError> {
    let start = Instant::now();
    let mut stdout = std::io::stdout();

    if cli.trajectories.len() > 1 {
        // Default multi-input behavior: one scalar per file, computed concurrently,
        // printed back in input order (spec's fixture row 6).
        let results: Vec<Result<f32, CliError>> = cli
            .trajectories
            .par_iter()
            .map(|path| scalar_for_path(path, online, parallel, types, cli.chunks))
            .collect();
        for result in results {
            sinks::write_scalar(&mut stdout, result?)?;
        }
    } else {
        let path = single_input(cli)?;
        let scalar = scalar_for_path(path, online, parallel, types, cli.chunks)?;
        sinks::write_scalar(&mut stdout, scalar)?;
    }

    if cli.timeit {
        eprintln!("elapsed: {:.6}s", start.elapsed().as_secs_f64());
    }
    Ok(())
}

fn run_per_frame(cli: &Cli, online: bool, types: Option<&[i64]>) -> Result<(), CliError> {
    let path = single_input(cli)?;
    let values = if online {
        let source = lammps::LammpsStreamSource::open(path, types)?;
        engine::per_frame(&source)?
    } else {
        let source = load_materialized(path, types)?;
        engine::per_frame(&source)?
    };

    let out_path = cli.output.clone().unwrap_or_else(|| PathBuf::from(OUT_PER_FRAME_TXT));
    let mut file = std::fs::File::create(&out_path)
        .map_err(|e| CliError::OutputWriteFailed(sinks::SinkError::Io(e)))?;
    sinks::write_series(&mut file, &values)?;
    Ok(())
}

fn run_per_atom(cli: &Cli, online: bool, types: Option<&[i64]>) -> Result<(), CliError> {
    let path = single_input(cli)?;
    let rows = if online {
        let source = lammps::LammpsStreamSource::open(path, types)?;
        engine::per_atom_per_frame(&source)?
    } else {
        let source = load_materialized(path, types)?;
        engine::per_atom_per_frame(&source)?
    };

    let out_path = cli.output.clone().unwrap_or_else(|| PathBuf::from(OUT_PER_ATOM_TXT));
    let mut file = std::fs::File::create(&out_path)
        .map_err(|e| CliError::OutputWriteFailed(sinks::SinkError::Io(e)))?;
    sinks::write_matrix(&mut file, &rows)?;
    Ok(())
}

fn run_plot(cli: &Cli, types: Option<&[i64]>) -> Result<(), CliError> {
    let path = single_input(cli)?;
    let source = load_materialized(path, types)?;
    let values = engine::per_frame(&source)?;

    let out_path = cli.output.clone().unwrap_or_else(|| PathBuf::from(OUT_PLOT_PDF));
    sinks::write_plot_pdf(&out_path, &values)?;
    Ok(())
}

fn run_decorate(cli: &Cli, types: Option<&[i64]>) -> Result<(), CliError> {
    let path = single_input(cli)?;
    let source = load_materialized(path, types)?;
    let rows = engine::per_atom_per_frame(&source)?;

    let out_path = cli.output.clone().unwrap_or_else(|| PathBuf::from(OUT_DECORATED));
    sinks::decorate_trajectory(path, &out_path, &rows)?;
    Ok(())
}

fn print_memory_estimate(path: &Path, types: Option<&[i64]>) -> Result<(), CliError> {
    let source = lammps::LammpsStreamSource::open(path, types)?;
    let estimate = MemoryEstimate::compute(source.num_frames(), source.num_atoms());

    let gb = |bytes: u64| bytes as f64 / 1024.0 / 1024.0 / 1024.0;
    println!("{}: {} frames, {} atoms", path.display(), estimate.num_frames(), estimate.num_atoms());
    println!("  trajectory scalar (-t):    {:.6} GB", gb(estimate.trajectory_scalar_bytes()));
    println!("  trajectory scalar (--ot):  {:.6} GB", gb(estimate.trajectory_scalar_online_bytes()));
    println!("  per-frame (-f):            {:.6} GB", gb(estimate.per_frame_bytes()));
    println!("  per-frame (--of):          {:.6} GB", gb(estimate.per_frame_online_bytes()));
    println!("  per-atom (-a):             {:.6} GB", gb(estimate.per_atom_bytes()));
    println!("  per-atom (--oa):           {:.6} GB", gb(estimate.per_atom_online_bytes()));
    std::io::stdout().flush().ok();
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
