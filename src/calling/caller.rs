use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alignment::pileup::{Pileup, PileupColumn, PileupEntry};
use crate::alignment::source::{AlignmentSource, SourceError};
use crate::calling::alternates::alternative_locations;
use crate::calling::call_data::CallData;
use crate::calling::config::{CallerConfig, ConfigError};
use crate::calling::filter::{is_uniquely_mapped, PileupContext, Verdict};
use crate::core::allele::Allele;
use crate::core::reference::Reference;

/// Reads up to this mapping quality also credit their alternative locations
pub const MAX_ALTERNATE_MAPPING_QUALITY: u8 = 3;

/// Log progress every this many pileup columns
const PROGRESS_INTERVAL: u64 = 1_000_000;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("Alignment input error: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Calls alleles from the alignments of one sample against a reference.
///
/// The caller holds only its configuration; all state of a run lives in the
/// returned [`CallData`] and a [`PileupContext`] scoped to
/// [`process`](Self::process), so one caller can serve many samples.
#[derive(Debug, Clone)]
pub struct VariantCaller {
    config: CallerConfig,
}

impl VariantCaller {
    /// Create a caller after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a threshold is out of range.
    pub fn new(config: CallerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    /// Run both passes over `source` and derive coverage, allele calls and gaps.
    ///
    /// # Errors
    ///
    /// Returns `CallError::Source` if the alignments cannot be read or are
    /// not coordinate sorted.
    pub fn process<S>(&self, reference: &Reference, source: &mut S) -> Result<CallData, CallError>
    where
        S: AlignmentSource + ?Sized,
    {
        let mut call_data = CallData::new(&reference.lengths(), self.config.min_gap);
        call_data.build_refmask(reference);

        self.check_scaffolds(&call_data, source.scaffold_names());

        info!("Estimating abundance...");
        self.estimate_abundance(&mut call_data, source)?;
        info!(
            reads = call_data.uniquely_mapped_reads,
            "Uniquely mapped reads"
        );

        info!("Processing pileups...");
        let context = self.process_pileups(&mut call_data, source, PileupContext::new())?;
        context.stats.log_summary();
        debug!(reads = context.discarded_count(), "Discarded reads");

        info!("Analyzing coverage...");
        call_data.analyze_coverage();

        info!("Calling alleles...");
        call_data.call_alleles(self.config.min_pileup_qual, self.config.min_qual_frac);

        info!("Finding gaps...");
        call_data.find_gaps();

        Ok(call_data)
    }

    /// Warn about alignment scaffolds missing from the reference
    fn check_scaffolds(&self, call_data: &CallData, scaffold_names: &[String]) {
        let unknown: HashSet<&str> = scaffold_names
            .iter()
            .map(String::as_str)
            .filter(|name| !call_data.contains(name))
            .collect();

        if !unknown.is_empty() {
            warn!(
                count = unknown.len(),
                "Alignment scaffolds not in the reference, their reads are ignored"
            );
            for name in unknown {
                debug!(scaffold = name, "Scaffold not in reference");
            }
        }
    }

    /// First pass: count uniquely mapped reads per scaffold.
    ///
    /// # Errors
    ///
    /// Returns `CallError::Source` if a record cannot be read.
    pub fn estimate_abundance<S>(&self, call_data: &mut CallData, source: &mut S) -> Result<(), CallError>
    where
        S: AlignmentSource + ?Sized,
    {
        for read in source.reads()? {
            let read = read?;

            if !is_uniquely_mapped(&read, &self.config) {
                continue;
            }

            if let Some(scaffold) = &read.scaffold {
                call_data.inc_uniquely_mapped_reads(scaffold);
            }
        }

        Ok(())
    }

    /// Second pass: assess every pileup entry and record its evidence.
    ///
    /// The context is returned so the caller can report its tallies.
    ///
    /// # Errors
    ///
    /// Returns `CallError::Source` if a record cannot be read or the input is
    /// not coordinate sorted.
    pub fn process_pileups<S>(
        &self,
        call_data: &mut CallData,
        source: &mut S,
        mut context: PileupContext,
    ) -> Result<PileupContext, CallError>
    where
        S: AlignmentSource + ?Sized,
    {
        let mut columns: u64 = 0;

        for column in Pileup::new(source.reads()?, self.config.max_depth) {
            let column = column?;
            self.assess_column(call_data, &column, &mut context);

            columns += 1;
            if columns % PROGRESS_INTERVAL == 0 {
                debug!(
                    columns,
                    scaffold = %column.scaffold,
                    position = column.position,
                    "Pileup progress"
                );
            }
        }

        Ok(context)
    }

    /// Assess all reads of one pileup column
    pub fn assess_column(&self, call_data: &mut CallData, column: &PileupColumn, context: &mut PileupContext) {
        for entry in &column.entries {
            self.assess_entry(call_data, &column.scaffold, column.position, entry, context);
        }
    }

    fn assess_entry(
        &self,
        call_data: &mut CallData,
        scaffold: &str,
        position: usize,
        entry: &PileupEntry,
        context: &mut PileupContext,
    ) {
        let allele = match context.assess(entry, &self.config) {
            Verdict::Accept(allele) => allele,
            Verdict::Reject(_) => {
                call_data.bad_read(scaffold, position);
                return;
            }
        };

        let read = &entry.read;

        if read.mapping_quality < self.config.min_mapping_quality {
            context.stats.low_mapping_quality += 1;
            call_data.low_mapping_quality(scaffold, position);

            for location in alternative_locations(read, position) {
                call_data.low_mapping_quality(&location.scaffold, location.position);
            }
            return;
        }

        let base_qual = read.base_quality(entry.query_position_or_next);
        call_data.good_read(scaffold, position, allele, base_qual, read.mapping_quality, false);

        if read.mapping_quality <= MAX_ALTERNATE_MAPPING_QUALITY {
            self.credit_alternates(call_data, entry, position, allele, base_qual);
        }
    }

    fn credit_alternates(
        &self,
        call_data: &mut CallData,
        entry: &PileupEntry,
        position: usize,
        allele: Allele,
        base_qual: u8,
    ) {
        let read = &entry.read;
        for location in alternative_locations(read, position) {
            call_data.good_read(
                &location.scaffold,
                location.position,
                allele,
                base_qual,
                read.mapping_quality,
                location.flip_strand,
            );
        }
    }
}
