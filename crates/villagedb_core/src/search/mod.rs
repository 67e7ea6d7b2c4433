//! View derivation over the in-memory full set.
//!
//! # Responsibility
//! - Filter, sort and paginate villages for presentation.
//! - Keep view shaping pure so the store only tracks query state.

pub mod view;
