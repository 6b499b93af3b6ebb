//! Coverage models used to flag implausible coverage and to scale gap sizes.
//!
//! ## High coverage cutoff
//!
//! In a metagenomic sample, reads from other organisms pile up on regions
//! that are conserved between species, inflating coverage there. A position
//! whose coverage is improbably high given the scaffold's typical coverage
//! can't be called confidently for the target strain.
//!
//! For typical coverages (below [`POISSON_MAX_MEAN`]) the cutoff is the
//! Poisson quantile at [`POISSON_TAIL_PROBABILITY`], one in ten million, so
//! not likely to be hit by chance in a bacterial genome. Above that the
//! Poisson tail becomes too narrow for real data and a linear rule is used.
//!
//! The two regimes do not meet exactly: just below the switch the Poisson
//! quantile is one higher than the linear rule at the switch (mean 49.9 gives
//! 91, mean 50 gives 90).
//!
//! ## Gap scaling
//!
//! At low coverage, long uncovered stretches occur by chance. The minimum gap
//! size is divided by the Lander-Waterman expected covered fraction
//! `1 - e^(-c)` at mean coverage `c`.

use statrs::distribution::{DiscreteCDF, Poisson};

/// Expected coverage used for the cutoff is never lower than this
pub const MIN_EXPECTED_COVERAGE: f64 = 0.5;

/// Below this expected coverage the Poisson model is used
pub const POISSON_MAX_MEAN: f64 = 50.0;

/// Cumulative probability defining the Poisson cutoff
pub const POISSON_TAIL_PROBABILITY: f64 = 0.999_999_9;

/// Slope of the linear cutoff for high expected coverage
pub const LINEAR_CUTOFF_SCALE: f64 = 1.5;

/// Intercept of the linear cutoff for high expected coverage
pub const LINEAR_CUTOFF_OFFSET: f64 = 15.0;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn linear_cutoff(mean: f64) -> u32 {
    (mean * LINEAR_CUTOFF_SCALE + LINEAR_CUTOFF_OFFSET).ceil() as u32
}

/// Highest plausible coverage of a position given the expected coverage.
///
/// Positions with coverage strictly above the returned value are considered
/// high coverage.
///
/// # Examples
///
/// ```
/// use strain_caller::calling::coverage::coverage_cutoff;
///
/// assert_eq!(coverage_cutoff(10.0), 30);
/// assert_eq!(coverage_cutoff(100.0), 165);
/// ```
#[must_use]
pub fn coverage_cutoff(mean: f64) -> u32 {
    if mean >= POISSON_MAX_MEAN {
        return linear_cutoff(mean);
    }

    let Ok(poisson) = Poisson::new(mean.max(f64::MIN_POSITIVE)) else {
        return linear_cutoff(mean);
    };

    // Smallest x with P(X <= x) >= tail probability
    (0_u64..)
        .find(|&x| poisson.cdf(x) >= POISSON_TAIL_PROBABILITY)
        .and_then(|x| u32::try_from(x).ok())
        .unwrap_or(u32::MAX)
}

/// Expected fraction of the genome covered at the given mean coverage
/// (Lander-Waterman).
#[must_use]
pub fn lander_waterman(coverage: f64) -> f64 {
    1.0 - (-coverage).exp()
}

/// Scale the minimum gap size for the scaffold's mean coverage.
///
/// Returns `min_gap` unchanged if the covered fraction is not positive.
#[must_use]
pub fn scale_min_gap_size(min_gap: usize, mean_coverage: f64) -> usize {
    let lw = lander_waterman(mean_coverage);

    if lw > 0.0 {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        {
            (min_gap as f64 / lw) as usize
        }
    } else {
        min_gap
    }
}
