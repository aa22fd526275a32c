//! vdem - decode a Source 2 demo file
//!
//! Writes frame and sub-message summaries, and the match metadata carried by
//! post-match details, as `match_data_<id>.json`.

use std::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vdem::avec::schema::ProtoSchema;

mod render;

use render::{Format, Renderer};

/// Read buffer size for demo files.
const BUFFER_SIZE: usize = 2 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "vdem")]
#[command(about = "Decode a Source 2 demo file")]
#[command(version)]
struct Cli {
    /// Path to the demo file
    #[arg(short, long)]
    file: PathBuf,

    /// Append frame summaries to a file
    #[arg(short, long, num_args = 0..=1, default_missing_value = "output.txt")]
    output: Option<PathBuf>,

    /// Quick mode: skip sub-message summaries
    #[arg(short, long)]
    quick: bool,

    /// Summary line format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Directory for match data files
    #[arg(long, default_value = ".")]
    json_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let file = File::open(&cli.file)
        .with_context(|| format!("opening {}", cli.file.display()))?;
    let reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let out = cli
        .output
        .as_ref()
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(BufWriter::new)
                .with_context(|| format!("opening {}", path.display()))
        })
        .transpose()?;

    let mut renderer = Renderer::new(out, cli.format, cli.quick, cli.json_dir);

    let summary = vdem::avec::decode_reader(reader, &ProtoSchema, &mut renderer)
        .with_context(|| format!("decoding {}", cli.file.display()))?;

    renderer.finish()?;

    info!(
        demo_id = summary.demo_id.as_deref().unwrap_or("unknown"),
        frames = summary.frames,
        "parsing done"
    );

    Ok(())
}
