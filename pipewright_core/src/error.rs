//! Error types for the pipewright engine
//!
//! This module contains all error types used throughout the library, organized
//! into logical categories for better maintainability and clarity.

use thiserror::Error;

pub mod codec;
pub mod execution;
pub mod io;
pub mod validation;

pub use self::codec::CodecError;
pub use self::execution::ExecutionError;
pub use self::io::{IoError, IoErrorKind};
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pipewright engine
///
/// Errors are categorized into four main types:
/// - Validation errors: stage incompatibilities and bad configuration,
///   raised while things are being built
/// - Execution errors: failures inside stage operations, raised while running
/// - I/O errors: filesystem access made by enhancers
/// - Codec errors: encode/decode failures of the serialization strategy
#[derive(Error, Debug)]
pub enum Error {
    /// Construction-time validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Stage execution errors
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Serialization errors
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl Error {
    /// Create an operation failure; the usual way for stage closures to fail
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::operation(message))
    }

    /// Whether this error was raised while building stages or pipelines
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Index of the failing stage, if the error carries one
    pub fn stage_index(&self) -> Option<usize> {
        match self {
            Self::Execution(err) => err.stage_index(),
            _ => None,
        }
    }

    /// Strip stage-position wrappers and return the error that started it all
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Execution(ExecutionError::StageFailed { source, .. }) => source.root_cause(),
            other => other,
        }
    }
}

// Conversions from external error types

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(CodecError::decode("json", err.to_string()))
    }
}
