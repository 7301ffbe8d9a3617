//! Serialization related error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by encode/decode strategies
#[derive(Error, Debug)]
pub enum CodecError {
    /// A value could not be encoded
    #[error("Failed to encode {type_name}: {message}")]
    Encode {
        type_name: &'static str,
        message: String,
    },

    /// Stored content could not be decoded into the requested type
    #[error("Failed to decode {}as {type_name}: {message}", format_path(.path))]
    Decode {
        path: Option<PathBuf>,
        type_name: &'static str,
        message: String,
    },

    /// The codec has no routine for the requested type
    #[error("No codec registered for type {type_name}")]
    UnregisteredType { type_name: &'static str },
}

fn format_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!("{} ", p.display()))
        .unwrap_or_default()
}

impl CodecError {
    /// Create an encode error
    pub fn encode(type_name: &'static str, message: impl Into<String>) -> Self {
        Self::Encode {
            type_name,
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(type_name: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            path: None,
            type_name,
            message: message.into(),
        }
    }

    /// Create an unregistered type error
    pub fn unregistered(type_name: &'static str) -> Self {
        Self::UnregisteredType { type_name }
    }

    /// Attach the file the content came from
    pub fn with_path(self, file: &std::path::Path) -> Self {
        match self {
            Self::Decode {
                type_name, message, ..
            } => Self::Decode {
                path: Some(file.to_path_buf()),
                type_name,
                message,
            },
            other => other,
        }
    }
}
