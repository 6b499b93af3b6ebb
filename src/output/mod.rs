//! Everything written after calling: the persisted call data, summary
//! reports and genome browser tracks.

pub mod store;
pub mod summary;
pub mod tracks;
