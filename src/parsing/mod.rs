//! Readers for the input files of a calling run.
//!
//! - **FASTA** ([`fasta`]): the reference genome, plain or gzip/bgzip compressed
//! - **BAM** ([`bam`]): coordinate-sorted alignments of a sample against that reference
//!
//! ## Example
//!
//! ```rust,no_run
//! use strain_caller::alignment::source::AlignmentSource;
//! use strain_caller::core::reference::Reference;
//! use strain_caller::parsing::bam::BamSource;
//! use std::path::Path;
//!
//! let reference = Reference::load(Path::new("reference.fa.gz")).unwrap();
//! let source = BamSource::open(Path::new("sample.bam")).unwrap();
//! println!("{} scaffolds, {} in BAM header", reference.scaffolds().len(), source.scaffold_names().len());
//! ```
//!
//! ## Tags
//!
//! From BAM records, the following optional tags are used:
//!
//! | Tag | Description | Used for |
//! |-----|-------------|----------|
//! | NM  | Edit distance to the reference | Mismatch filter, alternate hit ranking |
//! | XA  | Alternative hits (`chr,±pos,CIGAR,NM;`) | Repeat-aware evidence placement |

use thiserror::Error;

pub mod bam;
pub mod fasta;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Duplicate scaffold name: {0}")]
    DuplicateScaffold(String),
}
