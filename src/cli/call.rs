use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::alignment::pileup::DEFAULT_MAX_DEPTH;
use crate::calling::caller::VariantCaller;
use crate::calling::config::{
    CallerConfig, DEFAULT_MIN_GAP, DEFAULT_MIN_MAPPING_QUALITY, DEFAULT_MIN_PILEUP_QUAL,
    DEFAULT_MIN_QUAL, DEFAULT_MIN_QUAL_FRAC,
};
use crate::cli::{OutputFormat, ReportArgs};
use crate::core::reference::Reference;
use crate::output::store::StoredCalls;
use crate::parsing::bam::BamSource;

#[derive(Args)]
pub struct CallArgs {
    /// Reference FASTA, optionally gzip or bgzip compressed
    #[arg(required = true)]
    pub reference: PathBuf,

    /// Coordinate-sorted BAM file aligned against the reference
    #[arg(required = true)]
    pub bam: PathBuf,

    /// Output file for the call data
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub report: ReportArgs,

    // === Calling thresholds ===
    /// Minimum base quality
    #[arg(short = 'Q', long, default_value_t = DEFAULT_MIN_QUAL)]
    pub min_qual: u8,

    /// Minimum summed base quality for a strong call
    #[arg(short = 'P', long, default_value_t = DEFAULT_MIN_PILEUP_QUAL)]
    pub min_pileup_qual: u32,

    /// Minimum fraction of the summed base quality for a strong call
    #[arg(short = 'F', long, default_value_t = DEFAULT_MIN_QUAL_FRAC)]
    pub min_qual_frac: f64,

    /// Minimum mapping quality; reads below only count as low mapping quality evidence
    #[arg(short = 'M', long, default_value_t = DEFAULT_MIN_MAPPING_QUALITY)]
    pub min_mapping_quality: u8,

    /// Discard reads with more mismatches (NM tag); 0 disables the filter
    #[arg(short = 'N', long, default_value_t = 0)]
    pub max_mismatches: u32,

    /// Minimum gap size before scaling by coverage
    #[arg(short = 'G', long, default_value_t = DEFAULT_MIN_GAP)]
    pub min_gap: usize,

    /// Maximum number of reads per pileup position
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl CallArgs {
    #[must_use]
    pub fn caller_config(&self) -> CallerConfig {
        CallerConfig {
            min_qual: self.min_qual,
            min_pileup_qual: self.min_pileup_qual,
            min_qual_frac: self.min_qual_frac,
            min_mapping_quality: self.min_mapping_quality,
            max_mismatches: self.max_mismatches,
            min_gap: self.min_gap,
            max_depth: self.max_depth,
        }
    }
}

/// Execute the call subcommand
///
/// # Errors
///
/// Returns an error if the inputs cannot be read, the thresholds are
/// invalid or an output cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: CallArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = args.caller_config();
    let caller = VariantCaller::new(config.clone())?;

    if verbose {
        eprintln!(
            "Thresholds: base quality {}, pileup quality {}, quality fraction {}, mapping quality {}",
            config.min_qual, config.min_pileup_qual, config.min_qual_frac, config.min_mapping_quality
        );
    }

    let reference = Reference::load(&args.reference)?;
    let mut source = BamSource::open(&args.bam)?;

    let call_data = caller.process(&reference, &mut source)?;

    let stored = StoredCalls::new(config, call_data);
    stored.save(&args.output)?;
    info!(path = %args.output.display(), "Wrote call data");

    args.report.write(&stored.call_data, &args.output, format)
}
