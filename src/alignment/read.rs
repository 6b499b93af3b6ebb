use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::Flags;

/// Mapping quality reported when a record has none (SAM's 255)
pub const MISSING_MAPPING_QUALITY: u8 = 255;

/// An aligned read with the fields the calling engine needs.
///
/// This is decoupled from any particular file format: the BAM reader in
/// [`crate::parsing::bam`] converts noodles records into it, and tests or
/// other front-ends can build reads directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRead {
    /// Query template name; shared by both mates of a pair
    pub name: Vec<u8>,

    /// Name of the scaffold the read aligned to (`None` if unplaced)
    pub scaffold: Option<String>,

    pub flags: Flags,

    pub mapping_quality: u8,

    /// Zero-based leftmost aligned reference position
    pub alignment_start: usize,

    pub cigar: Vec<Op>,

    /// Query bases (hard clipped bases excluded)
    pub sequence: Vec<u8>,

    /// Phred base qualities, empty if the record has none
    pub quality_scores: Vec<u8>,

    pub template_length: i32,

    /// Edit distance to the reference (NM tag)
    pub mismatches: Option<u32>,

    /// Alternative hits (XA tag)
    pub alternative_hits: Option<String>,
}

impl AlignedRead {
    /// Create a mapped, unpaired, forward-strand read with MAPQ 60.
    pub fn new(
        name: impl Into<Vec<u8>>,
        scaffold: impl Into<String>,
        alignment_start: usize,
        cigar: Vec<Op>,
        sequence: impl Into<Vec<u8>>,
        quality_scores: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            scaffold: Some(scaffold.into()),
            flags: Flags::empty(),
            mapping_quality: 60,
            alignment_start,
            cigar,
            sequence: sequence.into(),
            quality_scores: quality_scores.into(),
            template_length: 0,
            mismatches: None,
            alternative_hits: None,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_mapping_quality(mut self, mapping_quality: u8) -> Self {
        self.mapping_quality = mapping_quality;
        self
    }

    #[must_use]
    pub fn with_template_length(mut self, template_length: i32) -> Self {
        self.template_length = template_length;
        self
    }

    #[must_use]
    pub fn with_mismatches(mut self, mismatches: u32) -> Self {
        self.mismatches = Some(mismatches);
        self
    }

    #[must_use]
    pub fn with_alternative_hits(mut self, hits: impl Into<String>) -> Self {
        self.alternative_hits = Some(hits.into());
        self
    }

    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.flags.is_segmented()
    }

    #[must_use]
    pub fn is_proper_pair(&self) -> bool {
        self.flags.is_properly_segmented()
    }

    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.flags.is_reverse_complemented()
    }

    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.flags.is_unmapped() || self.scaffold.is_none()
    }

    /// Number of query bases
    #[must_use]
    pub fn query_length(&self) -> usize {
        self.sequence.len()
    }

    /// True if any part of the read is soft or hard clipped
    #[must_use]
    pub fn is_clipped(&self) -> bool {
        self.cigar
            .iter()
            .any(|op| matches!(op.kind(), Kind::SoftClip | Kind::HardClip))
    }

    /// True unless the read is paired and its inferred insert is shorter
    /// than the read itself
    #[must_use]
    pub fn has_plausible_insert_size(&self) -> bool {
        !self.is_paired() || self.template_length.unsigned_abs() as usize >= self.query_length()
    }

    /// Number of reference bases covered by the alignment
    #[must_use]
    pub fn reference_length(&self) -> usize {
        self.cigar
            .iter()
            .filter(|op| {
                matches!(
                    op.kind(),
                    Kind::Match
                        | Kind::Deletion
                        | Kind::Skip
                        | Kind::SequenceMatch
                        | Kind::SequenceMismatch
                )
            })
            .map(|op| op.len())
            .sum()
    }

    /// Zero-based exclusive end of the alignment on the reference
    #[must_use]
    pub fn reference_end(&self) -> usize {
        self.alignment_start + self.reference_length()
    }

    /// Base quality at a query position; missing qualities read as 0.
    #[must_use]
    pub fn base_quality(&self, query_position: usize) -> u8 {
        self.quality_scores.get(query_position).copied().unwrap_or(0)
    }
}

/// Parse a CIGAR string such as `10M2I5M`.
///
/// Returns `None` for malformed strings (unknown operations, missing or
/// zero-padded lengths are fine, a trailing length without an operation is
/// not). `*` parses to an empty CIGAR.
#[must_use]
pub fn parse_cigar(s: &str) -> Option<Vec<Op>> {
    if s == "*" {
        return Some(Vec::new());
    }

    let mut ops = Vec::new();
    let mut len: Option<usize> = None;

    for c in s.chars() {
        if let Some(digit) = c.to_digit(10) {
            len = Some(len.unwrap_or(0).checked_mul(10)?.checked_add(digit as usize)?);
            continue;
        }

        let kind = match c {
            'M' => Kind::Match,
            'I' => Kind::Insertion,
            'D' => Kind::Deletion,
            'N' => Kind::Skip,
            'S' => Kind::SoftClip,
            'H' => Kind::HardClip,
            'P' => Kind::Pad,
            '=' => Kind::SequenceMatch,
            'X' => Kind::SequenceMismatch,
            _ => return None,
        };

        ops.push(Op::new(kind, len.take()?));
    }

    if len.is_some() || ops.is_empty() {
        return None;
    }

    Some(ops)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cigar() {
        let ops = parse_cigar("10M2I5M3D1S").unwrap();
        assert_eq!(
            ops,
            vec![
                Op::new(Kind::Match, 10),
                Op::new(Kind::Insertion, 2),
                Op::new(Kind::Match, 5),
                Op::new(Kind::Deletion, 3),
                Op::new(Kind::SoftClip, 1),
            ]
        );
        assert_eq!(parse_cigar("*"), Some(Vec::new()));
        assert!(parse_cigar("10").is_none());
        assert!(parse_cigar("M").is_none());
        assert!(parse_cigar("5Q").is_none());
        assert!(parse_cigar("").is_none());
    }

    #[test]
    fn test_reference_span() {
        let read = AlignedRead::new(
            "r1",
            "chr1",
            100,
            parse_cigar("2S5M2I3M4D2M").unwrap(),
            b"AACCCCCGGTTTAA".to_vec(),
            vec![30; 14],
        );
        assert_eq!(read.reference_length(), 14);
        assert_eq!(read.reference_end(), 114);
        assert_eq!(read.query_length(), 14);
        assert!(read.is_clipped());
    }

    #[test]
    fn test_insert_size_plausibility() {
        let read = AlignedRead::new("r", "chr1", 0, parse_cigar("4M").unwrap(), b"ACGT".to_vec(), vec![30; 4]);
        assert!(read.has_plausible_insert_size());

        let paired = read.clone().with_flags(Flags::SEGMENTED | Flags::PROPERLY_SEGMENTED);
        assert!(!paired.clone().with_template_length(3).has_plausible_insert_size());
        assert!(paired.clone().with_template_length(-4).has_plausible_insert_size());
        assert!(paired.with_template_length(300).has_plausible_insert_size());
    }

    #[test]
    fn test_missing_base_quality_reads_as_zero() {
        let read = AlignedRead::new("r", "chr1", 0, parse_cigar("2M").unwrap(), b"AC".to_vec(), Vec::new());
        assert_eq!(read.base_quality(0), 0);
    }
}
