//! The variant calling engine.
//!
//! [`VariantCaller::process`](caller::VariantCaller::process) makes two passes
//! over a sample's alignments:
//!
//! 1. **Abundance**: count uniquely mapped reads per scaffold.
//! 2. **Pileup**: run every pileup entry through the acceptance chain in
//!    [`filter`] and record allele, base quality and mapping quality evidence
//!    in the per-scaffold [`ScaffoldStats`](scaffold::ScaffoldStats).
//!
//! Three post-processing passes then derive coverage and the high coverage
//! mask, weak and strong allele calls, and gaps. The results are collected
//! in a [`CallData`](call_data::CallData), which also produces the summary
//! records.

pub mod alternates;
pub mod call_data;
pub mod caller;
pub mod config;
pub mod coverage;
pub mod filter;
pub mod scaffold;
