//! Alternative alignment locations from the `XA` tag.
//!
//! Aligners such as BWA list equally good (or nearly so) alternative
//! alignments of a read as `XA:Z:chr,±pos,CIGAR,NM;...` with 1-based
//! positions and the sign giving the strand. Evidence from a read with a
//! poor mapping quality is also credited to those locations.

use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::cigar::Op;
use tracing::debug;

use crate::alignment::read::{parse_cigar, AlignedRead};

/// One entry of an `XA` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternativeHit {
    pub scaffold: String,

    /// Zero-based leftmost position
    pub position: usize,

    pub reverse: bool,
    pub cigar: Vec<Op>,
    pub mismatches: u32,
}

impl AlternativeHit {
    /// Parse a single `chr,±pos,CIGAR,NM` entry
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let mut fields = s.split(',');
        let scaffold = fields.next().filter(|f| !f.is_empty())?;
        let position = fields.next()?;
        let cigar = parse_cigar(fields.next()?)?;
        let mismatches = fields.next()?.parse().ok()?;

        if fields.next().is_some() {
            return None;
        }

        let (reverse, position) = match position.as_bytes().first()? {
            b'-' => (true, &position[1..]),
            b'+' => (false, &position[1..]),
            _ => (false, position),
        };

        // XA positions are 1-based
        let position = position.parse::<usize>().ok()?.checked_sub(1)?;

        Some(Self {
            scaffold: scaffold.to_string(),
            position,
            reverse,
            cigar,
            mismatches,
        })
    }

    /// True if the alternative alignment has no clipping and no indels
    #[must_use]
    pub fn is_ungapped(&self) -> bool {
        !self.cigar.iter().any(|op| {
            matches!(
                op.kind(),
                Kind::SoftClip | Kind::HardClip | Kind::Deletion | Kind::Insertion
            )
        })
    }
}

/// Parse an `XA` tag value, skipping malformed entries.
#[must_use]
pub fn parse_alternative_hits(value: &str) -> Vec<AlternativeHit> {
    value
        .split(';')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let hit = AlternativeHit::parse(entry);
            if hit.is_none() {
                debug!(entry, "Skipping malformed alternative hit");
            }
            hit
        })
        .collect()
}

/// A reference position where a read's base also maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternativeLocation {
    pub scaffold: String,

    /// Zero-based position
    pub position: usize,

    /// The alternative alignment is on the other strand than the primary
    pub flip_strand: bool,
}

/// Positions corresponding to reference position `loc` of `read` in its
/// qualifying alternative alignments.
///
/// An alternative qualifies if it is ungapped and has no more mismatches
/// than the primary alignment. Reads without an `NM` tag have none.
#[must_use]
pub fn alternative_locations(read: &AlignedRead, loc: usize) -> Vec<AlternativeLocation> {
    let (Some(hits), Some(primary_mismatches)) = (&read.alternative_hits, read.mismatches) else {
        return Vec::new();
    };

    let reverse = read.is_reverse();

    // Offset of loc from the start of the read, in read orientation
    let offset = if reverse {
        read.reference_end().saturating_sub(loc + 1)
    } else {
        loc.saturating_sub(read.alignment_start)
    };

    let read_length = read.query_length();

    parse_alternative_hits(hits)
        .into_iter()
        .filter(|hit| hit.is_ungapped() && hit.mismatches <= primary_mismatches)
        .filter_map(|hit| {
            let position = if hit.reverse {
                (hit.position + read_length).checked_sub(offset + 1)?
            } else {
                hit.position + offset
            };

            Some(AlternativeLocation {
                flip_strand: hit.reverse != reverse,
                scaffold: hit.scaffold,
                position,
            })
        })
        .collect()
}
