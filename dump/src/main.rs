//! Command line entry point of the metadata dumper.

use clap::{Parser, ValueEnum};
use dcmio_dump::{dump_file, DumpOptions, OutputFormat};
use dcmio_object::DicomFile;
use dcmio_parser::read::ParseOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

/// Inspect the contents of a DICOM file.
#[derive(Debug, Parser)]
#[command(version)]
struct App {
    /// The DICOM file to inspect
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Show only these attributes (PS3.6 keyword or GGGG,EEEE);
    /// may be given multiple times
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Include private data elements
    #[arg(long)]
    show_private: bool,

    /// Append per-group statistics
    #[arg(long)]
    statistics: bool,

    /// Read files without a DICM preamble
    /// as Implicit VR Little Endian
    #[arg(long)]
    force: bool,
}

fn run(app: App) -> Result<(), Box<dyn std::error::Error>> {
    let options = ParseOptions {
        force: app.force,
        ..ParseOptions::default()
    };
    let file = DicomFile::open_with(&app.file, &options)?;
    for warning in file.warnings() {
        eprintln!("warning: {warning}");
    }

    let dump_options = DumpOptions {
        format: app.format.into(),
        tags: app.tags,
        show_private: app.show_private,
        statistics: app.statistics,
    };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dump_file(&file, &dump_options, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let app = App::parse();
    if let Err(error) = run(app) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
