use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calling::coverage::{coverage_cutoff, scale_min_gap_size, MIN_EXPECTED_COVERAGE};
use crate::core::allele::Allele;
use crate::utils::stats::{count_to_f64, median_in_place};

/// Per-allele tallies at one position, indexed by [`Allele::index`]
pub type AlleleTally = [u32; Allele::COUNT];

/// An uncovered region of a scaffold.
///
/// `start` and `end` are zero-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub start: usize,
    pub end: usize,
    pub length: usize,
}

impl Gap {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            length: end - start + 1,
        }
    }
}

/// A maximal run of equal values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    /// Inclusive
    pub end: usize,
    pub value: bool,
}

/// Maximal runs of equal values with at least `min_size` elements, in order.
#[must_use]
pub fn consecutive_runs(values: &[bool], min_size: usize) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start = 0;

    for i in 1..=values.len() {
        if i == values.len() || values[i] != values[start] {
            if i - start >= min_size {
                runs.push(Run {
                    start,
                    end: i - 1,
                    value: values[start],
                });
            }
            start = i;
        }
    }

    runs
}

/// Accumulated evidence and derived calls for one scaffold.
///
/// The raw per-position tallies are filled by the variant caller's pileup
/// pass. The derived arrays are computed afterwards, in order, by
/// [`calculate_coverage`](Self::calculate_coverage),
/// [`call_alleles`](Self::call_alleles) and [`find_gaps`](Self::find_gaps).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldStats {
    pub name: String,
    length: usize,

    /// Uniquely mapped reads (abundance pass)
    pub read_count: u64,

    /// Reference base per position; N where it is not A, C, G or T
    pub refmask: Vec<Allele>,

    allele_counts: Vec<AlleleTally>,
    allele_quals: Vec<AlleleTally>,

    /// Reads below the mapping quality threshold
    pub lowmq_count: Vec<u32>,

    /// Summed mapping quality of accepted reads
    pub mq_sum: Vec<u32>,

    /// Rejected reads
    pub bad: Vec<u32>,

    pub coverage: Vec<u32>,
    pub high_coverage: Vec<bool>,

    /// Every allele with any evidence
    pub weak: Vec<Allele>,

    /// Alleles passing the quality thresholds
    pub strong: Vec<Allele>,

    /// Positions dominated by low mapping quality reads
    pub lowmq: Vec<bool>,

    pub gaps: Vec<Gap>,

    pub mean_coverage: f64,
    pub median_coverage: f64,
    pub coverage_cutoff: u32,

    /// Updates dropped for positions past the scaffold end
    #[serde(skip)]
    out_of_range: u64,
}

impl ScaffoldStats {
    #[must_use]
    pub fn new(name: impl Into<String>, length: usize) -> Self {
        Self {
            name: name.into(),
            length,
            read_count: 0,
            refmask: vec![Allele::N; length],
            allele_counts: vec![[0; Allele::COUNT]; length],
            allele_quals: vec![[0; Allele::COUNT]; length],
            lowmq_count: vec![0; length],
            mq_sum: vec![0; length],
            bad: vec![0; length],
            coverage: vec![0; length],
            high_coverage: vec![false; length],
            weak: vec![Allele::N; length],
            strong: vec![Allele::N; length],
            lowmq: vec![false; length],
            gaps: Vec::new(),
            mean_coverage: 0.0,
            median_coverage: 0.0,
            coverage_cutoff: 0,
            out_of_range: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Set the reference mask from the scaffold sequence
    pub fn set_reference(&mut self, sequence: &[u8]) {
        self.refmask = sequence.iter().map(|&b| Allele::from_base(b)).collect();
        self.refmask.resize(self.length, Allele::N);
    }

    /// Only the first out-of-range update of a scaffold is a warning.
    fn in_bounds(&mut self, pos: usize) -> bool {
        if pos < self.length {
            return true;
        }

        if self.out_of_range == 0 {
            warn!(
                scaffold = %self.name,
                position = pos,
                length = self.length,
                "Position out of range, update ignored"
            );
        } else {
            debug!(scaffold = %self.name, position = pos, "Position out of range");
        }
        self.out_of_range += 1;
        false
    }

    /// Number of updates dropped because their position was out of range
    #[must_use]
    pub fn out_of_range_updates(&self) -> u64 {
        self.out_of_range
    }

    /// Record a read supporting `allele` at `pos`.
    ///
    /// Returns `false` if the update was dropped (position out of range or
    /// `allele` not a single allele).
    pub fn good_read(&mut self, pos: usize, allele: Allele, base_qual: u8, mapping_qual: u8) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }

        let Some(ix) = allele.index() else {
            debug!(scaffold = %self.name, position = pos, %allele, "Not a single allele");
            return false;
        };

        self.allele_counts[pos][ix] = self.allele_counts[pos][ix].saturating_add(1);
        self.allele_quals[pos][ix] = self.allele_quals[pos][ix].saturating_add(u32::from(base_qual));
        self.mq_sum[pos] = self.mq_sum[pos].saturating_add(u32::from(mapping_qual));
        true
    }

    /// Record a read below the mapping quality threshold at `pos`
    pub fn low_mapping_quality(&mut self, pos: usize) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.lowmq_count[pos] = self.lowmq_count[pos].saturating_add(1);
        true
    }

    /// Record a rejected read at `pos`
    pub fn bad_read(&mut self, pos: usize) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.bad[pos] = self.bad[pos].saturating_add(1);
        true
    }

    /// Compute per-position coverage, its mean and median, and flag
    /// positions above the plausible coverage cutoff.
    pub fn calculate_coverage(&mut self) {
        self.coverage = self
            .allele_counts
            .iter()
            .zip(&self.lowmq_count)
            .map(|(counts, lowmq)| counts.iter().sum::<u32>().saturating_add(*lowmq))
            .collect();

        let total: u64 = self.coverage.iter().map(|&c| u64::from(c)).sum();
        self.mean_coverage = if self.length == 0 {
            0.0
        } else {
            count_to_f64(total) / count_to_f64(self.length as u64)
        };

        let mut sorted = self.coverage.clone();
        self.median_coverage = median_in_place(&mut sorted);

        self.coverage_cutoff = coverage_cutoff(self.median_coverage.max(MIN_EXPECTED_COVERAGE));
        let cutoff = self.coverage_cutoff;
        self.high_coverage = self.coverage.iter().map(|&c| c > cutoff).collect();

        debug!(
            scaffold = %self.name,
            mean = self.mean_coverage,
            median = self.median_coverage,
            cutoff = self.coverage_cutoff,
            high = self.high_coverage.iter().filter(|&&h| h).count(),
            "Coverage"
        );
    }

    /// Derive weak and strong allele calls.
    ///
    /// An allele is weak with any quality evidence and strong when its
    /// summed quality exceeds `min_pileup_qual` and its share of the
    /// position's summed quality exceeds `min_qual_frac`. High coverage
    /// positions are not called.
    pub fn call_alleles(&mut self, min_pileup_qual: u32, min_qual_frac: f64) {
        for pos in 0..self.length {
            if self.high_coverage.get(pos).copied().unwrap_or(false) {
                self.weak[pos] = Allele::N;
                self.strong[pos] = Allele::N;
                continue;
            }

            let quals = &self.allele_quals[pos];
            let total: u32 = quals.iter().sum();

            let mut weak = Allele::N;
            let mut strong = Allele::N;

            for (allele, &qual) in Allele::ALL.iter().zip(quals) {
                if qual == 0 {
                    continue;
                }
                weak |= *allele;

                let fraction = f64::from(qual) / f64::from(total);
                if qual > min_pileup_qual && fraction > min_qual_frac {
                    strong |= *allele;
                }
            }

            self.weak[pos] = weak;
            self.strong[pos] = strong;
        }
    }

    /// Find uncovered regions of at least `min_gap` bases, scaled up for the
    /// scaffold's mean coverage.
    ///
    /// A position is covered if it has any allele evidence or is dominated by
    /// low mapping quality reads.
    pub fn find_gaps(&mut self, min_gap: usize) {
        let scaled = scale_min_gap_size(min_gap, self.mean_coverage);

        self.lowmq = self
            .lowmq_count
            .iter()
            .zip(&self.allele_counts)
            .map(|(&lowmq, counts)| lowmq > 1 && lowmq > counts.iter().sum::<u32>())
            .collect();

        let covered: Vec<bool> = self
            .weak
            .iter()
            .zip(&self.lowmq)
            .map(|(weak, &lowmq)| !weak.is_empty() || lowmq)
            .collect();

        self.gaps = consecutive_runs(&covered, scaled)
            .into_iter()
            .filter(|run| !run.value)
            .map(|run| Gap::new(run.start, run.end))
            .collect();

        debug!(
            scaffold = %self.name,
            min_gap = scaled,
            gaps = self.gaps.len(),
            "Gaps"
        );
    }

    /// Number of accepted reads at `pos`
    #[must_use]
    pub fn depth(&self, pos: usize) -> u32 {
        self.allele_counts.get(pos).map_or(0, |c| c.iter().sum())
    }

    /// Summed base quality of accepted reads at `pos`
    #[must_use]
    pub fn qual_total(&self, pos: usize) -> u32 {
        self.allele_quals.get(pos).map_or(0, |q| q.iter().sum())
    }

    /// Accepted plus low mapping quality reads at `pos`
    #[must_use]
    pub fn total_depth(&self, pos: usize) -> u32 {
        self.depth(pos)
            .saturating_add(self.lowmq_count.get(pos).copied().unwrap_or(0))
    }

    #[must_use]
    pub fn allele_count(&self, pos: usize, allele: Allele) -> u32 {
        match (self.allele_counts.get(pos), allele.index()) {
            (Some(counts), Some(ix)) => counts[ix],
            _ => 0,
        }
    }

    #[must_use]
    pub fn allele_qual(&self, pos: usize, allele: Allele) -> u32 {
        match (self.allele_quals.get(pos), allele.index()) {
            (Some(quals), Some(ix)) => quals[ix],
            _ => 0,
        }
    }

    fn reference_allele(&self, pos: usize) -> Allele {
        self.refmask.get(pos).copied().unwrap_or(Allele::N)
    }

    #[must_use]
    pub fn ref_count(&self, pos: usize) -> u32 {
        self.allele_count(pos, self.reference_allele(pos))
    }

    #[must_use]
    pub fn ref_qual(&self, pos: usize) -> u32 {
        self.allele_qual(pos, self.reference_allele(pos))
    }

    /// Share of the summed base quality supporting the reference base
    #[must_use]
    pub fn ref_fraction(&self, pos: usize) -> f64 {
        let total = self.qual_total(pos);
        if total == 0 {
            return 0.0;
        }
        f64::from(self.ref_qual(pos)) / f64::from(total)
    }

    #[must_use]
    pub fn mean_mapping_quality(&self, pos: usize) -> f64 {
        let depth = self.depth(pos);
        if depth == 0 {
            return 0.0;
        }
        f64::from(self.mq_sum[pos]) / f64::from(depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_runs() {
        let values = [true, true, false, false, false, true];
        let runs = consecutive_runs(&values, 1);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1], Run { start: 2, end: 4, value: false });

        let runs = consecutive_runs(&values, 3);
        assert_eq!(runs, vec![Run { start: 2, end: 4, value: false }]);

        // Runs of exactly the minimum size are kept
        let runs = consecutive_runs(&values, 2);
        assert_eq!(
            runs,
            vec![
                Run { start: 0, end: 1, value: true },
                Run { start: 2, end: 4, value: false },
            ]
        );

        assert_eq!(consecutive_runs(&[false], 1), vec![Run { start: 0, end: 0, value: false }]);

        assert!(consecutive_runs(&[], 1).is_empty());
    }

    #[test]
    fn test_updates_are_bounds_checked() {
        let mut stats = ScaffoldStats::new("chr1", 10);
        assert!(stats.good_read(9, Allele::A, 30, 60));
        assert!(!stats.good_read(10, Allele::A, 30, 60));
        assert!(!stats.low_mapping_quality(10));
        assert!(!stats.bad_read(42));
        assert!(!stats.good_read(0, Allele::N, 30, 60));
        assert_eq!(stats.depth(9), 1);
        assert_eq!(stats.depth(0), 0);
        assert_eq!(stats.out_of_range_updates(), 3);
    }

    #[test]
    fn test_accessors() {
        let mut stats = ScaffoldStats::new("chr1", 3);
        stats.set_reference(b"ACN");

        stats.good_read(0, Allele::A, 30, 60);
        stats.good_read(0, Allele::A, 20, 40);
        stats.good_read(0, Allele::T, 50, 10);
        stats.low_mapping_quality(0);

        assert_eq!(stats.depth(0), 3);
        assert_eq!(stats.total_depth(0), 4);
        assert_eq!(stats.qual_total(0), 100);
        assert_eq!(stats.ref_count(0), 2);
        assert_eq!(stats.ref_qual(0), 50);
        assert!((stats.ref_fraction(0) - 0.5).abs() < 1e-12);
        assert!((stats.mean_mapping_quality(0) - 110.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.allele_count(0, Allele::A | Allele::T), 0);
        assert_eq!(stats.allele_qual(0, Allele::N), 0);

        // No evidence
        assert_eq!(stats.ref_fraction(1), 0.0);
        assert_eq!(stats.mean_mapping_quality(1), 0.0);

        // Reference base N
        stats.good_read(2, Allele::G, 30, 60);
        assert_eq!(stats.ref_fraction(2), 0.0);
    }

    #[test]
    fn test_calculate_coverage() {
        let mut stats = ScaffoldStats::new("chr1", 4);
        for pos in 0..4 {
            stats.good_read(pos, Allele::A, 30, 60);
        }
        stats.low_mapping_quality(3);

        stats.calculate_coverage();
        assert_eq!(stats.coverage, vec![1, 1, 1, 2]);
        assert!((stats.mean_coverage - 1.25).abs() < 1e-12);
        assert!((stats.median_coverage - 1.0).abs() < 1e-12);
        assert_eq!(stats.coverage_cutoff, 10);
        assert!(stats.high_coverage.iter().all(|&h| !h));
    }

    #[test]
    fn test_high_coverage_positions_are_not_called() {
        let mut stats = ScaffoldStats::new("chr1", 10);
        stats.set_reference(b"AAAAAAAAAA");
        for pos in 0..10 {
            stats.good_read(pos, Allele::A, 30, 60);
        }
        // Median 1 -> cutoff 10; 11 reads at position 5
        for _ in 0..10 {
            stats.good_read(5, Allele::C, 30, 60);
        }

        stats.calculate_coverage();
        stats.call_alleles(20, 0.1);

        assert!(stats.high_coverage[5]);
        assert_eq!(stats.weak[5], Allele::N);
        assert_eq!(stats.strong[5], Allele::N);
        assert_eq!(stats.strong[0], Allele::A);
    }

    #[test]
    fn test_strong_thresholds_are_strict() {
        let mut stats = ScaffoldStats::new("chr1", 3);

        // Summed quality exactly at the threshold
        stats.good_read(0, Allele::A, 50, 60);

        // Above the threshold
        stats.good_read(1, Allele::A, 51, 60);

        // Fraction exactly at the threshold: 60 / 600 == 0.1
        stats.good_read(2, Allele::C, 60, 60);
        for _ in 0..9 {
            stats.good_read(2, Allele::G, 60, 60);
        }

        stats.calculate_coverage();
        stats.call_alleles(50, 0.1);

        assert_eq!(stats.weak[0], Allele::A);
        assert_eq!(stats.strong[0], Allele::N);
        assert_eq!(stats.strong[1], Allele::A);
        assert_eq!(stats.weak[2], Allele::C | Allele::G);
        assert_eq!(stats.strong[2], Allele::G);
    }

    #[test]
    fn test_strong_is_subset_of_weak() {
        let mut stats = ScaffoldStats::new("chr1", 5);
        for pos in 0..5 {
            for (i, allele) in Allele::ALL.iter().enumerate() {
                for _ in 0..=(pos + i) % 3 {
                    stats.good_read(pos, *allele, 25, 60);
                }
            }
        }
        stats.calculate_coverage();
        stats.call_alleles(30, 0.05);

        for pos in 0..5 {
            assert_eq!(stats.strong[pos] & stats.weak[pos], stats.strong[pos]);
        }
    }

    fn covered_except(length: usize, uncovered: std::ops::Range<usize>, depth: u32) -> ScaffoldStats {
        let mut stats = ScaffoldStats::new("chr1", length);
        for pos in (0..length).filter(|p| !uncovered.contains(p)) {
            for _ in 0..depth {
                stats.good_read(pos, Allele::A, 30, 60);
            }
        }
        stats.calculate_coverage();
        stats.call_alleles(50, 0.1);
        stats
    }

    #[test]
    fn test_gap_of_exactly_min_size() {
        // Mean coverage 18 scales the minimum by 1 / (1 - e^-18), which floors to 100
        let mut stats = covered_except(1000, 200..300, 20);
        stats.find_gaps(100);
        assert_eq!(stats.gaps, vec![Gap::new(200, 299)]);
        assert_eq!(stats.gaps[0].length, 100);
    }

    #[test]
    fn test_gap_one_shorter_is_not_reported() {
        let mut stats = covered_except(1000, 200..299, 20);
        stats.find_gaps(100);
        assert!(stats.gaps.is_empty());
    }

    #[test]
    fn test_low_mapping_quality_counts_as_covered() {
        let mut stats = covered_except(1000, 200..300, 20);
        for pos in 240..260 {
            stats.low_mapping_quality(pos);
            stats.low_mapping_quality(pos);
        }
        stats.find_gaps(30);

        assert!(stats.lowmq[250]);
        assert!(!stats.lowmq[100]);
        assert_eq!(stats.gaps, vec![Gap::new(200, 239), Gap::new(260, 299)]);
    }

    #[test]
    fn test_uncovered_scaffold_is_one_gap() {
        let mut stats = ScaffoldStats::new("chr1", 500);
        stats.calculate_coverage();
        stats.call_alleles(50, 0.1);
        stats.find_gaps(100);
        assert_eq!(stats.gaps, vec![Gap::new(0, 499)]);
    }
}
