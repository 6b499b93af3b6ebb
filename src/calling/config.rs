use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alignment::pileup::DEFAULT_MAX_DEPTH;

/// Default minimum base quality for a base to be considered
pub const DEFAULT_MIN_QUAL: u8 = 5;

/// Default minimum summed base quality for an allele to be trusted
pub const DEFAULT_MIN_PILEUP_QUAL: u32 = 50;

/// Default minimum quality-weighted fraction of the pileup for an allele
pub const DEFAULT_MIN_QUAL_FRAC: f64 = 0.1;

/// Default minimum mapping quality of a read
pub const DEFAULT_MIN_MAPPING_QUALITY: u8 = 5;

/// Default minimum gap size, before coverage scaling
pub const DEFAULT_MIN_GAP: usize = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// Thresholds used by the variant caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerConfig {
    /// Minimum base quality for a base to be considered
    pub min_qual: u8,

    /// Summed base quality an allele must exceed to be called strong
    pub min_pileup_qual: u32,

    /// Quality-weighted fraction an allele must exceed to be called strong
    pub min_qual_frac: f64,

    /// Reads below this mapping quality only count as low mapping quality evidence
    pub min_mapping_quality: u8,

    /// Reads with more mismatches (NM) are discarded; 0 disables the check
    pub max_mismatches: u32,

    /// Minimum size of an uncovered region to be reported as gap
    pub min_gap: usize,

    /// Maximum number of reads per pileup column
    pub max_depth: usize,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            min_qual: DEFAULT_MIN_QUAL,
            min_pileup_qual: DEFAULT_MIN_PILEUP_QUAL,
            min_qual_frac: DEFAULT_MIN_QUAL_FRAC,
            min_mapping_quality: DEFAULT_MIN_MAPPING_QUALITY,
            max_mismatches: 0,
            min_gap: DEFAULT_MIN_GAP,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CallerConfig {
    /// Check that all thresholds are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParameter` for a quality fraction outside
    /// `[0, 1]`, a zero gap size or a zero pileup depth.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_qual_frac) {
            return Err(ConfigError::InvalidParameter {
                parameter: "min-qual-frac",
                reason: format!("{} is not between 0 and 1", self.min_qual_frac),
            });
        }

        if self.min_gap == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "min-gap",
                reason: "must be >= 1".to_string(),
            });
        }

        if self.max_depth == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max-depth",
                reason: "must be >= 1".to_string(),
            });
        }

        Ok(())
    }

    /// True if the mismatch filter is active
    #[must_use]
    pub fn filters_mismatches(&self) -> bool {
        self.max_mismatches > 0
    }
}
