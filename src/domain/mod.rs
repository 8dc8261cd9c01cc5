//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the admission engine:
//! - Resolved customer identities and their storage keys
//! - The per-identity order history record and its invariants
//! - Admission decision values
//! - Time-window arithmetic for the rate limiting rules
//!
//! All types in this layer are pure and easily testable.

pub mod decision;
pub mod history;
pub mod identity;
pub mod rules;
