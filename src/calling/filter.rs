//! Read acceptance rules.
//!
//! Each pileup entry runs through a short-circuiting chain of checks. Reads
//! failing a per-read check (pairing, clipping, insert size, mismatches) are
//! remembered by name in the [`PileupContext`], so both mates and every later
//! position of the read are rejected without re-running the chain. A low base
//! quality only rejects the read at that one position.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::info;

use crate::alignment::pileup::PileupEntry;
use crate::alignment::read::AlignedRead;
use crate::calling::config::CallerConfig;
use crate::core::allele::Allele;

/// Minimum mapping quality for a read to count towards abundance
pub const UNIQUE_MIN_MAPPING_QUALITY: u8 = 3;

/// Reasons a read is not used at a pileup position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RejectionReason {
    /// Read was rejected at an earlier position
    PreviouslyDiscarded,
    /// Paired read that is not properly paired
    ImproperPair,
    /// Read is soft or hard clipped
    Clipped,
    /// Insert is shorter than the read
    InsertTooShort,
    /// More mismatches than allowed
    TooManyMismatches,
    /// Base quality below the minimum at this position
    LowBaseQuality,
    /// Base is not A, C, G or T
    UnknownBase,
}

impl RejectionReason {
    pub const ALL: [Self; 7] = [
        Self::PreviouslyDiscarded,
        Self::ImproperPair,
        Self::Clipped,
        Self::InsertTooShort,
        Self::TooManyMismatches,
        Self::LowBaseQuality,
        Self::UnknownBase,
    ];

    /// True if the whole read is discarded, not just this position
    #[must_use]
    pub fn discards_read(self) -> bool {
        matches!(
            self,
            Self::ImproperPair | Self::Clipped | Self::InsertTooShort | Self::TooManyMismatches
        )
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::PreviouslyDiscarded => "previously discarded",
            Self::ImproperPair => "improper pair",
            Self::Clipped => "clipped",
            Self::InsertTooShort => "insert too short",
            Self::TooManyMismatches => "too many mismatches",
            Self::LowBaseQuality => "low base quality",
            Self::UnknownBase => "unknown base",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of the acceptance chain for one pileup entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept(Allele),
    Reject(RejectionReason),
}

/// Tallies of pileup entries by outcome
#[derive(Debug, Clone, Default)]
pub struct FilterStats {
    pub accepted: u64,
    pub low_mapping_quality: u64,
    pub rejections: HashMap<RejectionReason, u64>,
}

impl FilterStats {
    pub fn record_rejection(&mut self, reason: RejectionReason) {
        *self.rejections.entry(reason).or_insert(0) += 1;
    }

    #[must_use]
    pub fn rejected(&self, reason: RejectionReason) -> u64 {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_rejected(&self) -> u64 {
        self.rejections.values().sum()
    }

    pub fn log_summary(&self) {
        info!(
            accepted = self.accepted,
            low_mapping_quality = self.low_mapping_quality,
            rejected = self.total_rejected(),
            "Pileup entries"
        );
        for reason in RejectionReason::ALL {
            let count = self.rejected(reason);
            if count > 0 {
                info!("  {reason}: {count}");
            }
        }
    }
}

/// State of one pileup pass: rejected read names and outcome tallies.
#[derive(Debug, Default)]
pub struct PileupContext {
    discarded: HashSet<Vec<u8>>,
    pub stats: FilterStats,
}

impl PileupContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_discarded(&self, name: &[u8]) -> bool {
        self.discarded.contains(name)
    }

    #[must_use]
    pub fn discarded_count(&self) -> usize {
        self.discarded.len()
    }

    /// Run the acceptance chain for one pileup entry and record the outcome.
    pub fn assess(&mut self, entry: &PileupEntry, config: &CallerConfig) -> Verdict {
        let verdict = self.evaluate(entry, config);

        match verdict {
            Verdict::Accept(_) => self.stats.accepted += 1,
            Verdict::Reject(reason) => {
                if reason.discards_read() {
                    self.discarded.insert(entry.read.name.clone());
                }
                self.stats.record_rejection(reason);
            }
        }

        verdict
    }

    fn evaluate(&self, entry: &PileupEntry, config: &CallerConfig) -> Verdict {
        let read = &entry.read;

        if self.is_discarded(&read.name) {
            return Verdict::Reject(RejectionReason::PreviouslyDiscarded);
        }

        if let Some(reason) = read_rejection(read, config) {
            return Verdict::Reject(reason);
        }

        if read.base_quality(entry.query_position_or_next) < config.min_qual {
            return Verdict::Reject(RejectionReason::LowBaseQuality);
        }

        let allele = entry_allele(entry);
        if allele.is_empty() {
            Verdict::Reject(RejectionReason::UnknownBase)
        } else {
            Verdict::Accept(allele)
        }
    }
}

/// Checks that reject the whole read, in chain order
fn read_rejection(read: &AlignedRead, config: &CallerConfig) -> Option<RejectionReason> {
    if read.is_paired() && !read.is_proper_pair() {
        Some(RejectionReason::ImproperPair)
    } else if read.is_clipped() {
        Some(RejectionReason::Clipped)
    } else if !read.has_plausible_insert_size() {
        Some(RejectionReason::InsertTooShort)
    } else if exceeds_mismatches(read, config) {
        Some(RejectionReason::TooManyMismatches)
    } else {
        None
    }
}

/// Missing NM counts as no mismatches
fn exceeds_mismatches(read: &AlignedRead, config: &CallerConfig) -> bool {
    config.filters_mismatches() && read.mismatches.unwrap_or(0) > config.max_mismatches
}

/// The allele a pileup entry shows
#[must_use]
pub fn entry_allele(entry: &PileupEntry) -> Allele {
    if entry.is_deletion {
        Allele::DEL
    } else if entry.insertion_follows {
        Allele::INS
    } else {
        entry.base().map_or(Allele::N, Allele::from_base)
    }
}

/// True if a read counts as uniquely mapped for abundance estimation.
#[must_use]
pub fn is_uniquely_mapped(read: &AlignedRead, config: &CallerConfig) -> bool {
    !read.is_unmapped()
        && read.mapping_quality >= UNIQUE_MIN_MAPPING_QUALITY
        && read.alternative_hits.is_none()
        && read_rejection(read, config).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::read::parse_cigar;
    use noodles::sam::alignment::record::Flags;
    use std::sync::Arc;

    fn read(name: &str, cigar: &str) -> AlignedRead {
        let seq = vec![b'A'; 10];
        AlignedRead::new(name, "chr1", 0, parse_cigar(cigar).unwrap(), seq, vec![30; 10])
    }

    fn entry(read: AlignedRead, query_position: usize) -> PileupEntry {
        PileupEntry {
            read: Arc::new(read),
            query_position: Some(query_position),
            query_position_or_next: query_position,
            is_deletion: false,
            insertion_follows: false,
        }
    }

    #[test]
    fn test_accepts_clean_read() {
        let mut context = PileupContext::new();
        let verdict = context.assess(&entry(read("r", "10M"), 3), &CallerConfig::default());
        assert_eq!(verdict, Verdict::Accept(Allele::A));
        assert_eq!(context.stats.accepted, 1);
    }

    #[test]
    fn test_mismatch_rejection_is_memoized() {
        let config = CallerConfig {
            max_mismatches: 2,
            ..CallerConfig::default()
        };
        let mut context = PileupContext::new();
        let bad = read("r", "10M").with_mismatches(3);

        assert_eq!(
            context.assess(&entry(bad.clone(), 0), &config),
            Verdict::Reject(RejectionReason::TooManyMismatches)
        );
        assert!(context.is_discarded(b"r"));

        for pos in 1..5 {
            assert_eq!(
                context.assess(&entry(bad.clone(), pos), &config),
                Verdict::Reject(RejectionReason::PreviouslyDiscarded)
            );
        }

        assert_eq!(context.stats.rejected(RejectionReason::TooManyMismatches), 1);
        assert_eq!(context.stats.rejected(RejectionReason::PreviouslyDiscarded), 4);
        assert_eq!(context.discarded_count(), 1);
    }

    #[test]
    fn test_mismatches_ignored_when_disabled_or_missing() {
        let mut context = PileupContext::new();
        let config = CallerConfig::default();
        let verdict = context.assess(&entry(read("r", "10M").with_mismatches(30), 0), &config);
        assert!(matches!(verdict, Verdict::Accept(_)));

        let config = CallerConfig {
            max_mismatches: 1,
            ..CallerConfig::default()
        };
        let verdict = context.assess(&entry(read("s", "10M"), 0), &config);
        assert!(matches!(verdict, Verdict::Accept(_)));
    }

    #[test]
    fn test_read_level_rejections() {
        let config = CallerConfig::default();
        let mut context = PileupContext::new();

        let improper = read("improper", "10M").with_flags(Flags::SEGMENTED);
        assert_eq!(
            context.assess(&entry(improper, 0), &config),
            Verdict::Reject(RejectionReason::ImproperPair)
        );

        let clipped = read("clipped", "2S8M");
        assert_eq!(
            context.assess(&entry(clipped, 0), &config),
            Verdict::Reject(RejectionReason::Clipped)
        );

        let short = read("short", "10M")
            .with_flags(Flags::SEGMENTED | Flags::PROPERLY_SEGMENTED)
            .with_template_length(8);
        assert_eq!(
            context.assess(&entry(short, 0), &config),
            Verdict::Reject(RejectionReason::InsertTooShort)
        );

        assert_eq!(context.discarded_count(), 3);
    }

    #[test]
    fn test_low_base_quality_is_not_memoized() {
        let config = CallerConfig::default();
        let mut context = PileupContext::new();

        let mut quals = vec![30; 10];
        quals[2] = 4;
        let r = AlignedRead::new("r", "chr1", 0, parse_cigar("10M").unwrap(), vec![b'C'; 10], quals);

        assert_eq!(
            context.assess(&entry(r.clone(), 2), &config),
            Verdict::Reject(RejectionReason::LowBaseQuality)
        );
        assert!(!context.is_discarded(b"r"));
        assert_eq!(context.assess(&entry(r, 3), &config), Verdict::Accept(Allele::C));
    }

    #[test]
    fn test_missing_qualities_fail_quality_check() {
        let r = AlignedRead::new("r", "chr1", 0, parse_cigar("4M").unwrap(), b"ACGT".to_vec(), Vec::new());
        let mut context = PileupContext::new();
        assert_eq!(
            context.assess(&entry(r, 0), &CallerConfig::default()),
            Verdict::Reject(RejectionReason::LowBaseQuality)
        );
    }

    #[test]
    fn test_entry_alleles() {
        let r = AlignedRead::new("r", "chr1", 0, parse_cigar("4M").unwrap(), b"ANGT".to_vec(), vec![30; 4]);
        let mut context = PileupContext::new();
        let config = CallerConfig::default();

        assert_eq!(
            context.assess(&entry(r.clone(), 1), &config),
            Verdict::Reject(RejectionReason::UnknownBase)
        );

        let mut deletion = entry(r.clone(), 2);
        deletion.query_position = None;
        deletion.is_deletion = true;
        assert_eq!(entry_allele(&deletion), Allele::DEL);

        let mut insertion = entry(r, 3);
        insertion.insertion_follows = true;
        assert_eq!(entry_allele(&insertion), Allele::INS);
    }

    #[test]
    fn test_is_uniquely_mapped() {
        let config = CallerConfig::default();
        assert!(is_uniquely_mapped(&read("r", "10M"), &config));
        assert!(is_uniquely_mapped(&read("r", "10M").with_mapping_quality(3), &config));
        assert!(!is_uniquely_mapped(&read("r", "10M").with_mapping_quality(2), &config));
        assert!(!is_uniquely_mapped(&read("r", "10M").with_flags(Flags::UNMAPPED), &config));
        assert!(!is_uniquely_mapped(
            &read("r", "10M").with_alternative_hits("chr2,+5,10M,0;"),
            &config
        ));
        assert!(!is_uniquely_mapped(&read("r", "3H7M"), &config));
    }
}
