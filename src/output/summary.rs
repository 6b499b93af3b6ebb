//! Writers for scaffold summary records.

use std::io::{self, Write};

use crate::calling::call_data::ScaffoldSummary;

/// Column names of the TSV summary, in output order
pub const TSV_COLUMNS: [&str; 22] = [
    "name",
    "length",
    "coverage",
    "median",
    "uReads",
    "abundance",
    "callable",
    "callablePct",
    "confirmed",
    "confirmedPct",
    "snps",
    "snpPct",
    "pureSnps",
    "pureSnpPct",
    "multi",
    "multiPct",
    "lowmq",
    "lowmqPct",
    "high",
    "highPct",
    "gapCount",
    "gapLength",
];

/// Write summaries as tab-separated values with a header line.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn write_tsv<W, I>(writer: &mut W, summaries: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = ScaffoldSummary>,
{
    writeln!(writer, "{}", TSV_COLUMNS.join("\t"))?;

    for s in summaries {
        writeln!(
            writer,
            "{}\t{}\t{:.3}\t{:.1}\t{}\t{:.4}\t{}\t{:.3}\t{}\t{:.3}\t{}\t{:.3}\t{}\t{:.3}\t{}\t{:.3}\t{}\t{:.3}\t{}\t{:.3}\t{}\t{}",
            s.name,
            s.length,
            s.coverage,
            s.median,
            s.unique_reads,
            s.abundance,
            s.callable,
            s.callable_pct,
            s.confirmed,
            s.confirmed_pct,
            s.snps,
            s.snp_pct,
            s.pure_snps,
            s.pure_snp_pct,
            s.multi,
            s.multi_pct,
            s.lowmq,
            s.lowmq_pct,
            s.high,
            s.high_pct,
            s.gap_count,
            s.gap_length,
        )?;
    }

    Ok(())
}

/// Write summaries as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W, I>(writer: &mut W, summaries: I) -> anyhow::Result<()>
where
    W: Write,
    I: IntoIterator<Item = ScaffoldSummary>,
{
    let summaries: Vec<ScaffoldSummary> = summaries.into_iter().collect();
    serde_json::to_writer_pretty(&mut *writer, &summaries)?;
    writeln!(writer)?;
    Ok(())
}

/// Write summaries as a human readable table.
///
/// # Errors
///
/// Returns an I/O error if writing fails.
pub fn write_text<W, I>(writer: &mut W, summaries: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = ScaffoldSummary>,
{
    let summaries: Vec<ScaffoldSummary> = summaries.into_iter().collect();
    let name_width = summaries
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("Scaffold".len());

    writeln!(
        writer,
        "{:<name_width$}  {:>10}  {:>8}  {:>8}  {:>9}  {:>10}  {:>8}  {:>8}  {:>6}  {:>6}  {:>10}",
        "Scaffold", "Length", "Coverage", "Median", "Abundance", "Callable", "SNPs", "Multi", "LowMQ", "Gaps", "GapLength"
    )?;
    writeln!(writer, "{}", "-".repeat(name_width + 103))?;

    for s in &summaries {
        if s.is_total() {
            writeln!(writer, "{}", "-".repeat(name_width + 103))?;
        }

        writeln!(
            writer,
            "{:<name_width$}  {:>10}  {:>8.2}  {:>8.1}  {:>9.4}  {:>9.2}%  {:>8}  {:>8}  {:>6}  {:>6}  {:>10}",
            s.name,
            s.length,
            s.coverage,
            s.median,
            s.abundance,
            s.callable_pct,
            s.snps,
            s.multi,
            s.lowmq,
            s.gap_count,
            s.gap_length,
        )?;
    }

    Ok(())
}
