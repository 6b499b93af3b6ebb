//! Small numeric helpers shared by the calling engine and the report writers.
//!
//! ## Division conventions
//!
//! Ratios show up all over the summaries (callable fraction, SNP fraction,
//! abundance, ...) and their denominators are legitimately zero for empty or
//! uncovered scaffolds. The convention used everywhere is:
//!
//! | numerator | denominator | result |
//! |-----------|-------------|--------|
//! | 0         | 0           | `0.0`  |
//! | n != 0    | 0           | `NaN`  |
//! | n         | d != 0      | `n / d`|
//!
//! A `0 / 0` means "nothing observed, nothing to report". A non-zero count
//! over an empty denominator is an inconsistency, and `NaN` makes it show up
//! in the output instead of silently reading as zero.

/// Helper function to convert a count to f64 with explicit precision loss allowance
#[inline]
#[must_use]
pub fn count_to_f64(count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Ratio of two counts following the division conventions of this module.
///
/// # Examples
///
/// ```
/// use strain_caller::utils::stats::ratio;
///
/// assert_eq!(ratio(1, 4), 0.25);
/// assert_eq!(ratio(0, 0), 0.0);
/// assert!(ratio(3, 0).is_nan());
/// ```
#[must_use]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        if numerator == 0 {
            0.0
        } else {
            f64::NAN
        }
    } else {
        count_to_f64(numerator) / count_to_f64(denominator)
    }
}

/// Percentage (0-100) of two counts, see [`ratio`] for zero denominators.
#[must_use]
pub fn pct(numerator: u64, denominator: u64) -> f64 {
    ratio(numerator, denominator) * 100.0
}

/// Median of a slice of counts, reordering the slice in place.
///
/// For an even number of values the mean of the two middle values is
/// returned. An empty slice has median 0.
#[must_use]
pub fn median_in_place(values: &mut [u32]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }

    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable(mid);
    let upper = f64::from(*upper);

    if n % 2 == 1 {
        upper
    } else {
        // The lower half is unordered; its maximum is the other middle value
        let lower_max = lower.iter().copied().max().map_or(upper, f64::from);
        (lower_max + upper) / 2.0
    }
}

/// Median of a slice of counts without modifying it.
#[must_use]
pub fn median(values: &[u32]) -> f64 {
    let mut copy = values.to_vec();
    median_in_place(&mut copy)
}
