//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the admission rules and manages runtime behavior:
//! - History cache (short-TTL cache in front of the tiered store)
//! - Per-identity lock table (serializes check-then-act placements)
//! - Admission engine (rule evaluation and state recording)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cache;
pub mod config;
pub mod engine;
pub mod locks;
pub mod ports;
pub mod resolver;
