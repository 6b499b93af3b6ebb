//! # strain-caller
//!
//! A library for strain-aware, per-position allele calling in metagenomic samples.
//!
//! Reads from a sample are aligned to a reference genome of one strain. In a
//! metagenome, the sample may hold a related strain, several of them, or
//! reads from other organisms that happen to align to conserved regions.
//! `strain-caller` collects allele evidence at every reference position and
//! turns it into calls that account for this:
//!
//! ## Features
//!
//! - **Read acceptance**: improperly paired, clipped and mismatch-heavy reads are rejected once and remembered by name
//! - **Repeat awareness**: evidence from reads with a poor mapping quality is also placed at their alternative alignments (`XA` tag)
//! - **Strong and weak calls**: alleles are called from summed base quality and their share of the position
//! - **Coverage masking**: positions with implausibly high coverage for the scaffold are not called
//! - **Gap finding**: uncovered regions longer than expected at the scaffold's coverage are reported
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use strain_caller::calling::caller::VariantCaller;
//! use strain_caller::calling::config::CallerConfig;
//! use strain_caller::core::reference::Reference;
//! use strain_caller::parsing::bam::BamSource;
//!
//! let reference = Reference::load(Path::new("reference.fa")).unwrap();
//! let mut source = BamSource::open(Path::new("sample.bam")).unwrap();
//!
//! let caller = VariantCaller::new(CallerConfig::default()).unwrap();
//! let call_data = caller.process(&reference, &mut source).unwrap();
//!
//! for summary in call_data.summarize() {
//!     println!("{}: {:.1}% callable, {} SNPs", summary.name, summary.callable_pct, summary.snps);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Alleles and the reference genome
//! - [`alignment`]: Aligned reads, alignment sources and pileups
//! - [`parsing`]: FASTA and BAM readers
//! - [`calling`]: The variant caller, per-scaffold statistics and summaries
//! - [`output`]: Call data persistence, summary reports and tracks
//! - [`cli`]: Command-line interface implementation

pub mod alignment;
pub mod calling;
pub mod cli;
pub mod core;
pub mod output;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use calling::call_data::{CallData, ScaffoldSummary};
pub use calling::caller::VariantCaller;
pub use calling::config::CallerConfig;
pub use core::allele::Allele;
pub use core::reference::Reference;
