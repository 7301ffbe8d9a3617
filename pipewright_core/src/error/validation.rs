//! Validation related error types

use thiserror::Error;

/// Construction-time validation and configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two adjacent stages (or a stage and a pipeline end) disagree on type
    #[error(
        "Type mismatch at position {position}: '{from_stage}' produces {from_type} but '{to_stage}' expects {to_type}"
    )]
    TypeMismatch {
        position: usize,
        from_stage: String,
        from_type: &'static str,
        to_stage: String,
        to_type: &'static str,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Invalid input parameter
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },
}

impl ValidationError {
    /// Create a type mismatch error
    pub fn type_mismatch(
        position: usize,
        from_stage: &str,
        from_type: &'static str,
        to_stage: &str,
        to_type: &'static str,
    ) -> Self {
        Self::TypeMismatch {
            position,
            from_stage: from_stage.to_string(),
            from_type,
            to_stage: to_stage.to_string(),
            to_type,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(message: &str) -> Self {
        Self::InvalidConfiguration {
            message: message.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, reason: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }
}
