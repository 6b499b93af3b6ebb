use std::path::PathBuf;

use clap::Args;

use crate::cli::{OutputFormat, ReportArgs};
use crate::output::store::StoredCalls;

#[derive(Args)]
pub struct ViewArgs {
    /// Call data written by `strain-caller call`
    #[arg(required = true)]
    pub calls: PathBuf,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Execute the view subcommand
///
/// # Errors
///
/// Returns an error if the call data cannot be loaded or an output cannot
/// be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: ViewArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let stored = StoredCalls::load(&args.calls)?;

    if verbose {
        let reference = stored
            .call_data
            .reference_path
            .as_ref()
            .map_or_else(|| "unknown".to_string(), |p| p.display().to_string());
        eprintln!(
            "Call data v{} created {} against {reference}",
            stored.version,
            stored.created_at.to_rfc3339()
        );
        eprintln!("Thresholds: {:?}", stored.config);
    }

    args.report.write(&stored.call_data, &args.calls, format)
}
