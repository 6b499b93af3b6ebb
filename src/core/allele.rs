use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

use serde::{Deserialize, Serialize};

/// Names of the single-bit alleles, in enumeration order.
const ALLELE_NAMES: [&str; Allele::COUNT] = ["A", "C", "G", "T", "INS", "DEL"];

/// Possible alleles at a reference position.
///
/// Alleles are bit flags, so values can be combined to indicate that several
/// alleles are present at the same location:
///
/// ```
/// use strain_caller::core::allele::Allele;
///
/// let both = Allele::A | Allele::T;
/// assert_eq!(both.iter().collect::<Vec<_>>(), vec![Allele::A, Allele::T]);
/// assert_eq!(both.to_string(), "A,T");
/// ```
///
/// The empty mask [`Allele::N`] denotes "no call" (unknown base).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allele(u8);

impl Allele {
    /// No call / unknown base
    pub const N: Self = Self(0);
    pub const A: Self = Self(1);
    pub const C: Self = Self(1 << 1);
    pub const G: Self = Self(1 << 2);
    pub const T: Self = Self(1 << 3);
    /// Insertion following this position
    pub const INS: Self = Self(1 << 4);
    /// Deletion of this position
    pub const DEL: Self = Self(1 << 5);

    /// Number of single-bit alleles (everything except `N`)
    pub const COUNT: usize = 6;

    /// All single-bit alleles in enumeration order
    pub const ALL: [Self; Self::COUNT] = [Self::A, Self::C, Self::G, Self::T, Self::INS, Self::DEL];

    /// The four nucleotide alleles
    pub const BASES: [Self; 4] = [Self::A, Self::C, Self::G, Self::T];

    const MASK: u8 = 0b0011_1111;

    /// Build an allele from raw bits; bits outside the six alleles are dropped.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Allele for a base call byte. Only upper-case `A`, `C`, `G` and `T`
    /// are recognized; anything else is `N`.
    #[must_use]
    pub const fn from_base(base: u8) -> Self {
        match base {
            b'A' => Self::A,
            b'C' => Self::C,
            b'G' => Self::G,
            b'T' => Self::T,
            _ => Self::N,
        }
    }

    /// Allele for a single character, see [`Allele::from_base`].
    #[must_use]
    pub fn from_char(c: char) -> Self {
        u8::try_from(c).map_or(Self::N, Self::from_base)
    }

    /// True for the empty mask (`N`)
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of alleles set
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// True if more than one allele is set
    #[must_use]
    pub const fn is_multi(self) -> bool {
        // x & (x - 1) clears the lowest set bit
        self.0 & self.0.wrapping_sub(1) != 0
    }

    /// True if every allele in `other` is also set in `self`
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Reverse complement of a single-base allele.
    ///
    /// Only defined for exactly one nucleotide bit; every other value
    /// (`N`, `INS`, `DEL`, combinations) is returned unchanged.
    #[must_use]
    pub const fn reverse_complement(self) -> Self {
        match self {
            Self::A => Self::T,
            Self::C => Self::G,
            Self::G => Self::C,
            Self::T => Self::A,
            other => other,
        }
    }

    /// Slot of a single-bit allele in per-allele arrays, `None` for `N` and
    /// combinations.
    #[must_use]
    pub const fn index(self) -> Option<usize> {
        if self.0.count_ones() == 1 {
            Some(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Iterate over the set alleles in enumeration order (A, C, G, T, INS, DEL).
    #[must_use]
    pub const fn iter(self) -> AlleleIter {
        AlleleIter { remaining: self.0 }
    }
}

/// Iterator over the single-bit alleles of an [`Allele`] mask.
#[derive(Debug, Clone)]
pub struct AlleleIter {
    remaining: u8,
}

impl Iterator for AlleleIter {
    type Item = Allele;

    fn next(&mut self) -> Option<Allele> {
        if self.remaining == 0 {
            return None;
        }

        let lowest = self.remaining & self.remaining.wrapping_neg();
        self.remaining &= !lowest;
        Some(Allele(lowest))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for AlleleIter {}

impl IntoIterator for Allele {
    type Item = Allele;
    type IntoIter = AlleleIter;

    fn into_iter(self) -> AlleleIter {
        self.iter()
    }
}

impl BitOr for Allele {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Allele {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Allele {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Allele {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitXor for Allele {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for Allele {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0 & Self::MASK)
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, allele) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if let Some(ix) = allele.index() {
                f.write_str(ALLELE_NAMES[ix])?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Allele(N)")
        } else {
            write!(f, "Allele({self})")
        }
    }
}
