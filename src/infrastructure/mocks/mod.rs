//! Test doubles for the engine's ports.
//!
//! Compiled for this crate's own tests and, behind the `test-helpers`
//! feature, for downstream integration tests.

mod clock;
mod orders;
mod store;

pub use clock::MockClock;
pub use orders::MockOrderSource;
pub use store::FlakyStore;
