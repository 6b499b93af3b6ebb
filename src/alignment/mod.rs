//! Aligned reads and pileups, independent of the file format they came from.
//!
//! - [`AlignedRead`](read::AlignedRead): the per-record fields used for calling
//! - [`AlignmentSource`](source::AlignmentSource): a re-readable, sorted set of reads
//! - [`Pileup`](pileup::Pileup): turns sorted reads into per-position columns

pub mod pileup;
pub mod read;
pub mod source;
