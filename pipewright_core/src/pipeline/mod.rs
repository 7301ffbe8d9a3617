//! Stages and the pipelines that sequence them
//!
//! This module provides the typed [`Stage`], its type-erased form
//! [`DynStage`], the chain operator that fuses stages, the compatibility
//! checks run when stages are assembled, and the in-memory [`Pipeline`].

pub mod compat;

mod combinators;
mod dyn_stage;
mod in_memory;
mod stage;

pub use combinators::StageExt;
pub use dyn_stage::DynStage;
pub use in_memory::{Pipeline, PipelineBuilder};
pub use stage::{Stage, StageBuilder, StageSignature};
