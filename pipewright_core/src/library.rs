//! Ready-made consumer stages
//!
//! Both stages pass their input through unchanged and only add a side
//! effect, so they can sit anywhere in a pipeline.

use crate::Result;
use crate::error::{CodecError, IoError};
use crate::pipeline::Stage;
use crate::types::{Datum, TypeInfo};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

type Formatter<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Prints every value to standard output
///
/// The printed text is `prefix + content + postfix`. Without a content
/// formatter the value's [`Display`] output is used; missing prefix and
/// postfix formatters contribute nothing.
pub struct FormatPrint<T> {
    content: Option<Formatter<T>>,
    prefix: Option<Formatter<T>>,
    postfix: Option<Formatter<T>>,
}

impl<T> Clone for FormatPrint<T> {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
            prefix: self.prefix.clone(),
            postfix: self.postfix.clone(),
        }
    }
}

impl<T: Datum + Display> Default for FormatPrint<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Datum + Display> FormatPrint<T> {
    pub fn new() -> Self {
        Self {
            content: None,
            prefix: None,
            postfix: None,
        }
    }

    pub fn content(mut self, format: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.content = Some(Arc::new(format));
        self
    }

    pub fn prefix(mut self, format: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.prefix = Some(Arc::new(format));
        self
    }

    pub fn postfix(mut self, format: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.postfix = Some(Arc::new(format));
        self
    }

    /// The text printed for `value`
    pub fn to_string(&self, value: &T) -> String {
        let apply = |formatter: &Option<Formatter<T>>| {
            formatter.as_ref().map(|format| format(value)).unwrap_or_default()
        };
        let content = match &self.content {
            Some(format) => format(value),
            None => value.to_string(),
        };
        format!("{}{content}{}", apply(&self.prefix), apply(&self.postfix))
    }

    /// A pass-through stage printing every value
    pub fn into_stage(self) -> Stage<T, T> {
        Stage::builder()
            .name("format-print")
            .consume(move |value: &T| {
                println!("{}", self.to_string(value));
                Ok(())
            })
            .assemble()
    }
}

/// Writes every value to a JSON file
///
/// The file path is taken from the value itself. Existing files are
/// overwritten.
pub struct WriteJsonFile<T> {
    filename: Arc<dyn Fn(&T) -> PathBuf + Send + Sync>,
}

impl<T> Clone for WriteJsonFile<T> {
    fn clone(&self) -> Self {
        Self {
            filename: Arc::clone(&self.filename),
        }
    }
}

impl<T: Datum + Serialize> WriteJsonFile<T> {
    /// Write each value to the path `filename` returns for it
    pub fn new<P: Into<PathBuf>>(filename: impl Fn(&T) -> P + Send + Sync + 'static) -> Self {
        Self {
            filename: Arc::new(move |value: &T| filename(value).into()),
        }
    }

    /// `value` as JSON indented by four spaces
    pub fn to_json(&self, value: &T) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|e| CodecError::encode(TypeInfo::of::<T>().name(), e.to_string()))?;
        String::from_utf8(buffer)
            .map_err(|e| CodecError::encode(TypeInfo::of::<T>().name(), e.to_string()).into())
    }

    /// Write `value` to its file
    pub fn write(&self, value: &T) -> Result<PathBuf> {
        let path = (self.filename)(value);
        let json = self.to_json(value)?;
        fs::write(&path, json).map_err(|e| IoError::at(&path, e))?;
        log::trace!("Wrote {}", path.display());
        Ok(path)
    }

    /// A pass-through stage writing every value
    pub fn into_stage(self) -> Stage<T, T> {
        Stage::builder()
            .name("write-json-file")
            .consume(move |value: &T| self.write(value).map(|_| ()))
            .assemble()
    }
}
