//! Store orchestration and read-only projections.
//!
//! # Responsibility
//! - Own the full village set and its mutation API.
//! - Derive consumer projections without touching storage.

pub mod insights;
pub mod village_store;
