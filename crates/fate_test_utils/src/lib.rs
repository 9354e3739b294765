//! # Fate Test Utilities
//!
//! Shared testing utilities:
//! - Determinism test harness
//! - Registry and session fixtures
//! - Property-based testing strategies
//! - Test log capture

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
