//! AIC Testing Infrastructure
//!
//! Shared fixtures for the ledger, store and server test suites:
//! deterministic keys, a controllable wall clock and a diff chain builder.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

/// Diff chain builders
pub mod chain;
/// Deterministic key fixtures
pub mod keys;
/// Controllable wall clock
pub mod time;

pub use chain::{document, genesis_for, ChainBuilder, CHAIN_EPOCH_MICROS};
pub use keys::KeyFixture;
pub use time::FixedClock;
