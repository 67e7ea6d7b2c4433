//! Village domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by the store and its consumers.
//! - Own input normalization for create/patch flows.
//!
//! # Invariants
//! - Every record is identified by a store-assigned `VillageId`.
//! - Deletion is a hard removal from the full set.

pub mod village;
