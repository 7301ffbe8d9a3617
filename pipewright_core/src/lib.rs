//! Pipewright Core Library
//!
//! A composable data-transformation engine. Typed stages produce, transform
//! and consume values; pipelines sequence them with their types checked up
//! front; enhancers run the same stages against a shared context such as an
//! in-memory slot map or a directory tree.

pub mod codec;
pub mod config;
pub mod enhance;
pub mod error;
pub mod filesystem;
pub mod library;
pub mod pipeline;
pub mod types;

// Re-export main types
pub use codec::{Codec, JsonCodec};
pub use config::{ConfigLoader, EngineConfig, FileSystemConfig};
pub use enhance::{
    ContextSlots, EnhancedPipeline, MemoryContext, MemoryPipeline, StageEnhancer, StageLifter,
    StagePosition,
};
pub use error::{Error, Result};
pub use filesystem::{FileSystemContext, FileSystemEnhancer, FileSystemPipeline};
pub use library::{FormatPrint, WriteJsonFile};
pub use pipeline::{DynStage, Pipeline, PipelineBuilder, Stage, StageBuilder, StageExt};
pub use types::{Datum, TypeInfo, Value};
