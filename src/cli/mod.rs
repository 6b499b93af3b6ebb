//! Command-line interface for strain-caller.
//!
//! Available commands:
//!
//! - **call**: Call alleles, coverage and gaps from a BAM file against a reference
//! - **view**: Report on previously saved call data
//!
//! ## Usage
//!
//! ```text
//! # Call a sample and write a TSV summary
//! strain-caller call reference.fa.gz sample.bam -o sample.calls -s sample.tsv --format tsv
//!
//! # Also write gap and low mapping quality BED tracks
//! strain-caller call reference.fa sample.bam -o sample.calls --tracks gaps,lowmq
//!
//! # Summarize saved calls as JSON
//! strain-caller view sample.calls --format json
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::calling::call_data::CallData;
use crate::output::summary::{write_json, write_text, write_tsv};
use crate::output::tracks::{parse_tracks, write_tracks};

pub mod call;
pub mod view;

#[derive(Parser)]
#[command(name = "strain-caller")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Strain-aware allele calling, coverage and gap analysis for metagenomic samples")]
#[command(
    long_about = "strain-caller collects per-position allele evidence from reads aligned to a reference genome.\n\nFor every scaffold it reports:\n- Strong and weak allele calls, and where they differ from the reference\n- Coverage, with implausibly high coverage regions masked\n- Regions dominated by low mapping quality reads\n- Gaps: uncovered regions longer than expected by chance"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Call alleles from a coordinate-sorted BAM file
    Call(call::CallArgs),

    /// Report on saved call data
    View(view::ViewArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Report options shared by `call` and `view`
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Write the summary to this file instead of stdout
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// Tracks to write: comma separated list of gaps, callable, lowmq,
    /// high-coverage, coverage, multimapped, bad, or all
    #[arg(long)]
    pub tracks: Option<String>,

    /// Minimum region size for BED tracks
    #[arg(long, default_value = "1")]
    pub track_min_size: usize,
}

impl ReportArgs {
    /// Write the summary and the requested tracks.
    ///
    /// Tracks are written next to `prefix` with its extension replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the track list is invalid or writing fails.
    pub fn write(&self, call_data: &CallData, prefix: &Path, format: OutputFormat) -> anyhow::Result<()> {
        let tracks = match &self.tracks {
            Some(list) => parse_tracks(list).map_err(anyhow::Error::msg)?,
            None => Vec::new(),
        };

        match &self.summary {
            Some(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                write_summary(&mut writer, call_data, format)?;
                writer.flush()?;
                info!(path = %path.display(), "Wrote summary");
            }
            None => {
                let stdout = io::stdout();
                let mut writer = stdout.lock();
                write_summary(&mut writer, call_data, format)?;
                writer.flush()?;
            }
        }

        if !tracks.is_empty() {
            write_tracks(&prefix.with_extension(""), &tracks, call_data, self.track_min_size)?;
        }

        Ok(())
    }
}

fn write_summary<W: Write>(writer: &mut W, call_data: &CallData, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => write_text(writer, call_data.summarize())?,
        OutputFormat::Json => write_json(writer, call_data.summarize())?,
        OutputFormat::Tsv => write_tsv(writer, call_data.summarize())?,
    }
    Ok(())
}
