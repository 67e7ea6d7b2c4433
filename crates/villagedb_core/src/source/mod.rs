//! Initial-load sources.
//!
//! # Responsibility
//! - Define where the first village document is fetched from.
//! - Keep payload shape checks in one place for every source.

pub mod remote;
