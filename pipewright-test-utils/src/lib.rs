//! Test utilities for the pipewright engine
//!
//! This crate provides fixture record types, builders for seeded directory
//! trees, and enhancers that record what happens during an enhanced run.

pub mod builders;
pub mod fixtures;
pub mod mocks;

// Re-export commonly used types
pub use builders::{TempRoot, TempRootBuilder};
pub use fixtures::{Initial, Intermediate, Intermediate2, fixture_codec};
pub use mocks::{EnhancerEvent, EventLog, RecordingEnhancer, RecordingLifter};
