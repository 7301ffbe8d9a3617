//! Execution related error types

use thiserror::Error;

/// Errors raised while stages run
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A produce, transform or consume operation reported a failure
    #[error("Operation failed: {message}")]
    Operation { message: String },

    /// A value reached a stage that cannot accept its type
    #[error("Stage '{stage}' expected {expected} but received {actual}")]
    UnexpectedValue {
        stage: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A stage failed while running inside a pipeline
    #[error("Stage {index} ('{stage}') failed{}: {source}", format_input(.input))]
    StageFailed {
        index: usize,
        stage: String,
        input: Option<String>,
        #[source]
        source: Box<crate::Error>,
    },
}

fn format_input(input: &Option<String>) -> String {
    input
        .as_ref()
        .map(|label| format!(" on input '{label}'"))
        .unwrap_or_default()
}

impl ExecutionError {
    /// Create an operation failure
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }

    /// Create an unexpected value error
    pub fn unexpected_value(stage: &str, expected: &'static str, actual: &'static str) -> Self {
        Self::UnexpectedValue {
            stage: stage.to_string(),
            expected,
            actual,
        }
    }

    /// Wrap an error with the position of the stage that raised it
    pub fn stage_failed(
        index: usize,
        stage: &str,
        input: Option<&str>,
        source: crate::Error,
    ) -> Self {
        Self::StageFailed {
            index,
            stage: stage.to_string(),
            input: input.map(str::to_string),
            source: Box::new(source),
        }
    }

    /// Index of the failing stage, if known
    pub fn stage_index(&self) -> Option<usize> {
        match self {
            Self::StageFailed { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error() {
        let error = ExecutionError::operation("division by zero");
        assert!(error.to_string().contains("Operation failed"));
        assert!(error.to_string().contains("division by zero"));
        assert_eq!(error.stage_index(), None);
    }

    #[test]
    fn test_stage_failed_identifies_stage_and_input() {
        let inner = crate::Error::operation("boom");
        let error = ExecutionError::stage_failed(2, "parse", Some("record_7"), inner);

        let message = error.to_string();
        assert!(message.contains("Stage 2"));
        assert!(message.contains("'parse'"));
        assert!(message.contains("on input 'record_7'"));
        assert!(message.contains("boom"));
        assert_eq!(error.stage_index(), Some(2));
    }

    #[test]
    fn test_stage_failed_without_input() {
        let inner = crate::Error::operation("boom");
        let error = ExecutionError::stage_failed(0, "source", None, inner);
        assert!(!error.to_string().contains("on input"));
    }
}
