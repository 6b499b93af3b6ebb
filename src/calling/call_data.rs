use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calling::scaffold::ScaffoldStats;
use crate::core::allele::Allele;
use crate::core::reference::Reference;
use crate::utils::stats::{count_to_f64, median_in_place, pct, ratio};

/// Name of the genome-wide summary record
pub const TOTAL_NAME: &str = "TOTAL";

/// Variant calling results for all scaffolds of a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallData {
    scaffolds: Vec<ScaffoldStats>,

    /// Index: scaffold name -> index in scaffolds vec (rebuilt after load)
    #[serde(skip)]
    name_to_index: HashMap<String, usize>,

    /// Reference FASTA the calls were made against
    pub reference_path: Option<PathBuf>,

    pub reference_length: usize,
    pub mean_coverage: f64,
    pub median_coverage: f64,
    pub uniquely_mapped_reads: u64,

    /// Minimum gap size before coverage scaling
    pub min_gap_size: usize,
}

impl CallData {
    /// Create empty call data for scaffolds given as `(name, length)`.
    #[must_use]
    pub fn new(scaffolds: &[(String, usize)], min_gap_size: usize) -> Self {
        let scaffolds: Vec<ScaffoldStats> = scaffolds
            .iter()
            .map(|(name, length)| ScaffoldStats::new(name.clone(), *length))
            .collect();

        let mut call_data = Self {
            reference_length: scaffolds.iter().map(ScaffoldStats::len).sum(),
            scaffolds,
            name_to_index: HashMap::new(),
            reference_path: None,
            mean_coverage: 0.0,
            median_coverage: 0.0,
            uniquely_mapped_reads: 0,
            min_gap_size,
        };
        call_data.rebuild_index();
        call_data
    }

    /// Rebuild the name index (after deserialization)
    pub fn rebuild_index(&mut self) {
        self.name_to_index = self
            .scaffolds
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
    }

    /// Set the reference base masks of all scaffolds
    pub fn build_refmask(&mut self, reference: &Reference) {
        for scaffold in reference.scaffolds() {
            if let Some(stats) = self.scaffold_mut(&scaffold.name) {
                stats.set_reference(&scaffold.sequence);
            }
        }

        self.reference_path = reference
            .path
            .as_ref()
            .map(|path| path.canonicalize().unwrap_or_else(|_| path.clone()));
    }

    #[must_use]
    pub fn scaffolds(&self) -> &[ScaffoldStats] {
        &self.scaffolds
    }

    #[must_use]
    pub fn scaffold(&self, name: &str) -> Option<&ScaffoldStats> {
        self.name_to_index.get(name).map(|&i| &self.scaffolds[i])
    }

    fn scaffold_mut(&mut self, name: &str) -> Option<&mut ScaffoldStats> {
        let stats = self
            .name_to_index
            .get(name)
            .and_then(|&i| self.scaffolds.get_mut(i));

        if stats.is_none() {
            debug!(scaffold = name, "Unknown scaffold, update ignored");
        }
        stats
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Count a uniquely mapped read on `scaffold`
    pub fn inc_uniquely_mapped_reads(&mut self, scaffold: &str) -> bool {
        let Some(stats) = self.scaffold_mut(scaffold) else {
            return false;
        };
        stats.read_count += 1;
        self.uniquely_mapped_reads += 1;
        true
    }

    pub fn bad_read(&mut self, scaffold: &str, pos: usize) -> bool {
        self.scaffold_mut(scaffold)
            .is_some_and(|stats| stats.bad_read(pos))
    }

    pub fn low_mapping_quality(&mut self, scaffold: &str, pos: usize) -> bool {
        self.scaffold_mut(scaffold)
            .is_some_and(|stats| stats.low_mapping_quality(pos))
    }

    /// Record evidence for `allele`, reverse complemented first if `rc`.
    pub fn good_read(
        &mut self,
        scaffold: &str,
        pos: usize,
        allele: Allele,
        base_qual: u8,
        mapping_qual: u8,
        rc: bool,
    ) -> bool {
        let allele = if rc { allele.reverse_complement() } else { allele };
        self.scaffold_mut(scaffold)
            .is_some_and(|stats| stats.good_read(pos, allele, base_qual, mapping_qual))
    }

    /// Per-scaffold coverage, then the genome-wide mean and median.
    pub fn analyze_coverage(&mut self) {
        for scaffold in &mut self.scaffolds {
            scaffold.calculate_coverage();
        }

        let mut all: Vec<u32> = self
            .scaffolds
            .iter()
            .flat_map(|s| s.coverage.iter().copied())
            .collect();

        let total: u64 = all.iter().map(|&c| u64::from(c)).sum();
        self.mean_coverage = if self.reference_length == 0 {
            0.0
        } else {
            count_to_f64(total) / count_to_f64(self.reference_length as u64)
        };
        self.median_coverage = median_in_place(&mut all);

        info!(
            mean = self.mean_coverage,
            median = self.median_coverage,
            "Genome coverage"
        );
    }

    pub fn call_alleles(&mut self, min_pileup_qual: u32, min_qual_frac: f64) {
        for scaffold in &mut self.scaffolds {
            scaffold.call_alleles(min_pileup_qual, min_qual_frac);
        }
    }

    pub fn find_gaps(&mut self) {
        for scaffold in &mut self.scaffolds {
            scaffold.find_gaps(self.min_gap_size);
        }
    }

    /// One summary per scaffold in reference order, then the `TOTAL` record.
    #[must_use]
    pub fn summarize(&self) -> Summaries<'_> {
        Summaries {
            call_data: self,
            next: 0,
            totals: Totals::default(),
            done: false,
        }
    }
}

/// Summary statistics of one scaffold, or of the whole genome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldSummary {
    pub name: String,
    pub length: u64,

    /// Mean coverage, excluding high coverage positions
    pub coverage: f64,
    pub median: f64,

    /// Uniquely mapped reads
    #[serde(rename = "uReads")]
    pub unique_reads: u64,

    /// Share of all uniquely mapped reads
    pub abundance: f64,

    /// Positions with a strong call
    pub callable: u64,
    pub callable_pct: f64,

    /// Callable positions supporting the reference base
    pub confirmed: u64,
    pub confirmed_pct: f64,

    /// Callable positions with a non-reference allele
    pub snps: u64,
    pub snp_pct: f64,

    /// SNPs with a single allele
    pub pure_snps: u64,
    pub pure_snp_pct: f64,

    /// Positions with more than one strong allele
    pub multi: u64,
    pub multi_pct: f64,

    pub lowmq: u64,
    pub lowmq_pct: f64,
    pub high: u64,
    pub high_pct: f64,
    pub gap_count: u64,
    pub gap_length: u64,
}

impl ScaffoldSummary {
    #[must_use]
    pub fn is_total(&self) -> bool {
        self.name == TOTAL_NAME
    }
}

#[derive(Debug, Default)]
struct Totals {
    weighted_coverage: f64,
    callable: u64,
    confirmed: u64,
    snps: u64,
    multi: u64,
    pure_snps: u64,
    lowmq: u64,
    high: u64,
    gap_count: u64,
    gap_length: u64,
}

/// Lazy iterator over scaffold summaries, see [`CallData::summarize`]
pub struct Summaries<'a> {
    call_data: &'a CallData,
    next: usize,
    totals: Totals,
    done: bool,
}

fn count(n: usize) -> u64 {
    n as u64
}

impl Summaries<'_> {
    fn scaffold_summary(&mut self, scaffold: &ScaffoldStats) -> ScaffoldSummary {
        let length = count(scaffold.len());

        let mut callable = 0;
        let mut confirmed = 0;
        let mut snps = 0;
        let mut multi = 0;

        for (strong, refmask) in scaffold.strong.iter().zip(&scaffold.refmask) {
            if strong.is_empty() {
                continue;
            }
            callable += 1;
            if !(*strong & *refmask).is_empty() {
                confirmed += 1;
            }
            if !(*strong & !*refmask).is_empty() {
                snps += 1;
            }
            if strong.is_multi() {
                multi += 1;
            }
        }

        // A multi-allele call always has a non-reference allele
        let pure_snps = u64::saturating_sub(snps, multi);

        let lowmq = count(scaffold.lowmq.iter().filter(|&&l| l).count());
        let high = count(scaffold.high_coverage.iter().filter(|&&h| h).count());

        let summed_coverage: u64 = scaffold
            .coverage
            .iter()
            .zip(&scaffold.high_coverage)
            .filter(|&(_, &high)| !high)
            .map(|(&c, _)| u64::from(c))
            .sum::<u64>()
            + lowmq;
        let coverage = if length == 0 {
            0.0
        } else {
            count_to_f64(summed_coverage) / count_to_f64(length)
        };

        let mut with_lowmq: Vec<u32> = scaffold
            .coverage
            .iter()
            .zip(&scaffold.lowmq)
            .map(|(&c, &l)| c + u32::from(l))
            .collect();
        let median = median_in_place(&mut with_lowmq);

        let gap_count = count(scaffold.gaps.len());
        let gap_length = count(scaffold.gaps.iter().map(|g| g.length).sum());

        let totals = &mut self.totals;
        totals.weighted_coverage += coverage * count_to_f64(length);
        totals.callable += callable;
        totals.confirmed += confirmed;
        totals.snps += snps;
        totals.multi += multi;
        totals.pure_snps += pure_snps;
        totals.lowmq += lowmq;
        totals.high += high;
        totals.gap_count += gap_count;
        totals.gap_length += gap_length;

        ScaffoldSummary {
            name: scaffold.name.clone(),
            length,
            coverage,
            median,
            unique_reads: scaffold.read_count,
            abundance: ratio(scaffold.read_count, self.call_data.uniquely_mapped_reads),
            callable,
            callable_pct: pct(callable, length),
            confirmed,
            confirmed_pct: pct(confirmed, callable),
            snps,
            snp_pct: pct(snps, callable),
            pure_snps,
            pure_snp_pct: pct(pure_snps, callable),
            multi,
            multi_pct: pct(multi, snps),
            lowmq,
            lowmq_pct: pct(lowmq, length),
            high,
            high_pct: pct(high, length),
            gap_count,
            gap_length,
        }
    }

    fn total_summary(&self) -> ScaffoldSummary {
        let t = &self.totals;
        let length = count(self.call_data.reference_length);

        ScaffoldSummary {
            name: TOTAL_NAME.to_string(),
            length,
            coverage: if length == 0 {
                0.0
            } else {
                t.weighted_coverage / count_to_f64(length)
            },
            median: self.call_data.median_coverage,
            unique_reads: self.call_data.uniquely_mapped_reads,
            abundance: 1.0,
            callable: t.callable,
            callable_pct: pct(t.callable, length),
            confirmed: t.confirmed,
            confirmed_pct: pct(t.confirmed, t.callable),
            snps: t.snps,
            snp_pct: pct(t.snps, t.callable),
            pure_snps: t.pure_snps,
            pure_snp_pct: pct(t.pure_snps, t.callable),
            multi: t.multi,
            multi_pct: pct(t.multi, t.snps),
            lowmq: t.lowmq,
            lowmq_pct: pct(t.lowmq, length),
            high: t.high,
            high_pct: pct(t.high, length),
            gap_count: t.gap_count,
            gap_length: t.gap_length,
        }
    }
}

impl Iterator for Summaries<'_> {
    type Item = ScaffoldSummary;

    fn next(&mut self) -> Option<ScaffoldSummary> {
        if self.done {
            return None;
        }

        let call_data = self.call_data;
        if let Some(scaffold) = call_data.scaffolds.get(self.next) {
            self.next += 1;
            return Some(self.scaffold_summary(scaffold));
        }

        self.done = true;
        Some(self.total_summary())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done {
            0
        } else {
            self.call_data.scaffolds.len() - self.next + 1
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Summaries<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::Scaffold;

    fn lengths() -> Vec<(String, usize)> {
        vec![("chr1".to_string(), 10), ("chr2".to_string(), 5)]
    }

    #[test]
    fn test_new() {
        let data = CallData::new(&lengths(), 2000);
        assert_eq!(data.reference_length, 15);
        assert_eq!(data.scaffolds().len(), 2);
        assert_eq!(data.scaffold("chr2").map(ScaffoldStats::len), Some(5));
        assert!(data.scaffold("chr3").is_none());
    }

    #[test]
    fn test_unknown_scaffold_updates_are_dropped() {
        let mut data = CallData::new(&lengths(), 2000);
        assert!(!data.good_read("chr3", 0, Allele::A, 30, 60, false));
        assert!(!data.bad_read("chr3", 0));
        assert!(!data.inc_uniquely_mapped_reads("chr3"));
        assert_eq!(data.uniquely_mapped_reads, 0);
    }

    #[test]
    fn test_good_read_reverse_complements() {
        let mut data = CallData::new(&lengths(), 2000);
        assert!(data.good_read("chr1", 3, Allele::A, 30, 60, true));
        let stats = data.scaffold("chr1").unwrap();
        assert_eq!(stats.allele_count(3, Allele::T), 1);
        assert_eq!(stats.allele_count(3, Allele::A), 0);
    }

    #[test]
    fn test_build_refmask() {
        let reference = Reference::from_scaffolds(vec![
            Scaffold::new("chr1", b"ACGTNacgtA".to_vec()),
            Scaffold::new("chr2", b"TTTTT".to_vec()),
        ])
        .unwrap();
        let mut data = CallData::new(&reference.lengths(), 2000);
        data.build_refmask(&reference);

        let chr1 = data.scaffold("chr1").unwrap();
        assert_eq!(chr1.refmask[0], Allele::A);
        assert_eq!(chr1.refmask[4], Allele::N);
        assert_eq!(chr1.refmask[5], Allele::N);
        assert!(data.reference_path.is_none());
    }

    fn called_data() -> CallData {
        let reference = Reference::from_scaffolds(vec![
            Scaffold::new("chr1", b"AAAAAAAAAA".to_vec()),
            Scaffold::new("chr2", b"CCCCC".to_vec()),
        ])
        .unwrap();
        let mut data = CallData::new(&reference.lengths(), 3);
        data.build_refmask(&reference);

        // chr1: reference calls at 0..4, a SNP at 4, a multi call at 5
        for pos in [0, 1, 2, 3, 5] {
            for _ in 0..3 {
                data.good_read("chr1", pos, Allele::A, 30, 60, false);
            }
        }
        data.good_read("chr1", 4, Allele::A, 30, 60, false);
        for _ in 0..3 {
            data.good_read("chr1", 4, Allele::G, 40, 60, false);
            data.good_read("chr1", 5, Allele::T, 40, 60, false);
        }

        data.inc_uniquely_mapped_reads("chr1");
        data.inc_uniquely_mapped_reads("chr1");
        data.inc_uniquely_mapped_reads("chr1");
        data.inc_uniquely_mapped_reads("chr2");

        data.analyze_coverage();
        data.call_alleles(50, 0.1);
        data.find_gaps();
        data
    }

    #[test]
    fn test_summaries_end_with_total() {
        let data = called_data();
        let summaries: Vec<_> = data.summarize().collect();

        assert_eq!(summaries.len(), 3);
        assert_eq!(data.summarize().len(), 3);
        assert_eq!(summaries[0].name, "chr1");
        assert_eq!(summaries[1].name, "chr2");
        assert!(summaries[2].is_total());
        assert!(!summaries[0].is_total());
    }

    #[test]
    fn test_scaffold_summary_counts() {
        let data = called_data();
        let chr1 = data.summarize().next().unwrap();

        assert_eq!(chr1.length, 10);
        assert_eq!(chr1.unique_reads, 3);
        assert!((chr1.abundance - 0.75).abs() < 1e-12);

        // 0..4 confirmed A; 4 is G only (A quality too low); 5 is A and T
        assert_eq!(chr1.callable, 6);
        assert_eq!(chr1.confirmed, 5);
        assert_eq!(chr1.snps, 2);
        assert_eq!(chr1.multi, 1);
        assert_eq!(chr1.pure_snps, 1);
        assert!((chr1.callable_pct - 60.0).abs() < 1e-9);
        assert!((chr1.multi_pct - 50.0).abs() < 1e-9);

        // 6..10 uncovered, scaled minimum gap is 3 at this coverage
        assert_eq!(chr1.gap_count, 1);
        assert_eq!(chr1.gap_length, 4);
    }

    #[test]
    fn test_uncovered_scaffold_summary() {
        let data = called_data();
        let chr2 = data.summarize().nth(1).unwrap();

        assert_eq!(chr2.callable, 0);
        assert_eq!(chr2.confirmed_pct, 0.0);
        assert_eq!(chr2.snp_pct, 0.0);
        assert_eq!(chr2.coverage, 0.0);
        assert!((chr2.abundance - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_total_summary() {
        let data = called_data();
        let summaries: Vec<_> = data.summarize().collect();
        let total = &summaries[2];

        assert_eq!(total.length, 15);
        assert_eq!(total.unique_reads, 4);
        assert_eq!(total.abundance, 1.0);
        assert_eq!(total.callable, summaries[0].callable + summaries[1].callable);
        assert_eq!(total.gap_count, summaries[0].gap_count + summaries[1].gap_count);
        assert!((total.callable_pct - 40.0).abs() < 1e-9);

        let weighted = (summaries[0].coverage * 10.0 + summaries[1].coverage * 5.0) / 15.0;
        assert!((total.coverage - weighted).abs() < 1e-12);
        assert_eq!(total.median, data.median_coverage);
    }

    #[test]
    fn test_summary_serializes_with_report_names() {
        let data = called_data();
        let summary = data.summarize().next().unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        assert!(json.get("uReads").is_some());
        assert!(json.get("callablePct").is_some());
        assert!(json.get("pureSnpPct").is_some());
        assert!(json.get("gapLength").is_some());
        assert!(json.get("unique_reads").is_none());
    }
}
