//! Genome browser tracks derived from call data.
//!
//! Region tracks are BED (zero-based, half-open); per-position value tracks
//! are fixed-step Wiggle.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::calling::call_data::CallData;
use crate::calling::scaffold::{consecutive_runs, ScaffoldStats};

/// Available tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    /// Uncovered regions
    Gaps,
    /// Regions with a strong call
    Callable,
    /// Regions dominated by low mapping quality reads
    LowMq,
    /// Regions with implausibly high coverage
    HighCoverage,
    /// Coverage per position
    Coverage,
    /// Low mapping quality reads per position
    Multimapped,
    /// Rejected reads per position
    Bad,
}

impl Track {
    pub const ALL: [Self; 7] = [
        Self::Gaps,
        Self::Callable,
        Self::LowMq,
        Self::HighCoverage,
        Self::Coverage,
        Self::Multimapped,
        Self::Bad,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Gaps => "gaps",
            Self::Callable => "callable",
            Self::LowMq => "lowmq",
            Self::HighCoverage => "high-coverage",
            Self::Coverage => "coverage",
            Self::Multimapped => "multimapped",
            Self::Bad => "bad",
        }
    }

    /// File name suffix, appended to the output prefix
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Gaps => ".gaps.bed",
            Self::Callable => ".callable.bed",
            Self::LowMq => ".lowmq.bed",
            Self::HighCoverage => ".high_coverage.bed",
            Self::Coverage => ".coverage.wig",
            Self::Multimapped => ".multimapped.wig",
            Self::Bad => ".bad.wig",
        }
    }

    /// Write this track for all scaffolds.
    ///
    /// Region tracks only include regions of at least `min_size` bases;
    /// gaps are always written in full.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn write<W: Write>(self, writer: &mut W, call_data: &CallData, min_size: usize) -> io::Result<()> {
        for scaffold in call_data.scaffolds() {
            match self {
                Self::Gaps => {
                    for gap in &scaffold.gaps {
                        writeln!(writer, "{}\t{}\t{}", scaffold.name, gap.start, gap.end + 1)?;
                    }
                }
                Self::Callable => {
                    let mask: Vec<bool> = scaffold.strong.iter().map(|a| !a.is_empty()).collect();
                    write_bed_regions(writer, &scaffold.name, &mask, min_size)?;
                }
                Self::LowMq => write_bed_regions(writer, &scaffold.name, &scaffold.lowmq, min_size)?,
                Self::HighCoverage => {
                    write_bed_regions(writer, &scaffold.name, &scaffold.high_coverage, min_size)?;
                }
                Self::Coverage => write_wig(writer, scaffold, &scaffold.coverage)?,
                Self::Multimapped => write_wig(writer, scaffold, &scaffold.lowmq_count)?,
                Self::Bad => write_wig(writer, scaffold, &scaffold.bad)?,
            }
        }

        Ok(())
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|track| track.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|t| t.name()).collect();
                format!("unknown track '{s}' (expected one of: {}, all)", names.join(", "))
            })
    }
}

/// Parse a comma separated track list; `all` selects every track.
///
/// # Errors
///
/// Returns a message naming the first unknown track.
pub fn parse_tracks(s: &str) -> Result<Vec<Track>, String> {
    let mut tracks = Vec::new();

    for name in s.split(',').filter(|n| !n.trim().is_empty()) {
        if name.trim().eq_ignore_ascii_case("all") {
            return Ok(Track::ALL.to_vec());
        }
        let track = name.parse::<Track>()?;
        if !tracks.contains(&track) {
            tracks.push(track);
        }
    }

    Ok(tracks)
}

fn write_bed_regions<W: Write>(writer: &mut W, name: &str, mask: &[bool], min_size: usize) -> io::Result<()> {
    for run in consecutive_runs(mask, min_size.max(1)) {
        if run.value {
            writeln!(writer, "{name}\t{}\t{}", run.start, run.end + 1)?;
        }
    }
    Ok(())
}

fn write_wig<W: Write>(writer: &mut W, scaffold: &ScaffoldStats, values: &[u32]) -> io::Result<()> {
    writeln!(writer, "fixedStep chrom={} start=1 step=1", scaffold.name)?;
    for value in values {
        writeln!(writer, "{value}")?;
    }
    Ok(())
}

/// Write the selected tracks next to `prefix`, returning the files written.
///
/// # Errors
///
/// Returns an I/O error if a file cannot be created or written.
pub fn write_tracks(
    prefix: &Path,
    tracks: &[Track],
    call_data: &CallData,
    min_size: usize,
) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(tracks.len());

    for track in tracks {
        let mut path = prefix.as_os_str().to_owned();
        path.push(track.suffix());
        let path = PathBuf::from(path);

        info!(track = %track, path = %path.display(), "Writing track");
        let mut writer = BufWriter::new(File::create(&path)?);
        track.write(&mut writer, call_data, min_size)?;
        writer.flush()?;

        written.push(path);
    }

    Ok(written)
}
