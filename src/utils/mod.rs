//! Shared helper functions.

pub mod stats;
