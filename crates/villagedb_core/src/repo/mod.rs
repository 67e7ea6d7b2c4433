//! Persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the durable cache contract used by the store.
//! - Isolate SQLite details from store orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`InvalidData`,
//!   `MissingRequiredTable`) in addition to DB transport errors.

pub mod cache_repo;
