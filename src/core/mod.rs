//! Core data types for strain-aware allele calling.
//!
//! - [`Allele`](allele::Allele): bit-flag set over the four bases plus insertion and deletion
//! - [`Reference`](reference::Reference): the ordered scaffolds of the reference genome
//!
//! ## Coordinates
//!
//! Internally all positions are zero-based offsets into a scaffold. Public
//! helpers that take or return 1-based coordinates say so explicitly:
//!
//! | Helper | Input | Output |
//! |--------|-------|--------|
//! | `Reference::scaffold_coordinate` | 0-based genome offset | (name, 1-based) |
//! | `Reference::genome_coordinate`   | (name, 1-based)       | 0-based genome offset |
//! | `Reference::sequence_slice`      | (name, 1-based start, length) | bases |

pub mod allele;
pub mod reference;
