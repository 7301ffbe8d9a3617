//! Type-erased stages
//!
//! Pipelines hold stages of different types side by side. A [`DynStage`]
//! keeps the declared [`StageSignature`] of the typed stage it was made from
//! so that compatibility can still be checked before anything runs.

use super::stage::{Stage, StageSignature};
use crate::Result;
use crate::error::ExecutionError;
use crate::types::{Datum, TypeInfo, Value};
use std::fmt::{self, Debug};
use std::sync::Arc;

pub(crate) type ErasedRunner = Arc<dyn Fn(Option<Value>) -> Result<Vec<Value>> + Send + Sync>;

/// A stage whose input and output types are only known at run time
#[derive(Clone)]
pub struct DynStage {
    pub(crate) name: Arc<str>,
    pub(crate) signature: StageSignature,
    pub(crate) has_producer: bool,
    pub(crate) has_transformer: bool,
    pub(crate) runner: ErasedRunner,
}

impl Debug for DynStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynStage")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("has_producer", &self.has_producer)
            .field("has_transformer", &self.has_transformer)
            .finish()
    }
}

impl DynStage {
    /// Name of the underlying stage
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared input and output types
    pub fn signature(&self) -> StageSignature {
        self.signature
    }

    /// Declared input type
    pub fn input_type(&self) -> TypeInfo {
        self.signature.input
    }

    /// Declared output type
    pub fn output_type(&self) -> TypeInfo {
        self.signature.output
    }

    /// Whether the stage emits values of its own before handling input
    pub fn has_producer(&self) -> bool {
        self.has_producer
    }

    /// Whether the stage maps its input to outputs
    pub fn has_transformer(&self) -> bool {
        self.has_transformer
    }

    /// Whether the stage ignores its input entirely
    pub fn is_source(&self) -> bool {
        self.has_producer && !self.has_transformer
    }

    /// Run the stage on an erased input
    ///
    /// An input of the wrong type is reported as
    /// [`ExecutionError::UnexpectedValue`] rather than reaching stage code.
    pub fn run(&self, input: Option<Value>) -> Result<Vec<Value>> {
        (self.runner)(input)
    }

    /// Run the stage on a typed input and take typed outputs back
    pub fn run_typed<I: Datum, O: Datum>(&self, input: Option<I>) -> Result<Vec<O>> {
        self.run(input.map(Value::new))?
            .into_iter()
            .map(|value| downcast_output::<O>(&self.name, value))
            .collect()
    }
}

impl<I: Datum, O: Datum> From<Stage<I, O>> for DynStage {
    fn from(stage: Stage<I, O>) -> Self {
        stage.into_dyn()
    }
}

impl<I: Datum, O: Datum> Stage<I, O> {
    /// Erase the stage's types
    pub fn into_dyn(self) -> DynStage {
        let signature = self.signature();
        let name: Arc<str> = Arc::from(self.name.as_str());
        let stage_name = Arc::clone(&name);
        let runner = self.runner;

        DynStage {
            name,
            signature,
            has_producer: self.has_producer,
            has_transformer: self.has_transformer,
            runner: Arc::new(move |input: Option<Value>| {
                let input = input
                    .map(|value| downcast_input::<I>(&stage_name, value))
                    .transpose()?;
                Ok(runner(input)?.into_iter().map(Value::new).collect())
            }),
        }
    }
}

fn downcast_input<I: Datum>(stage: &str, value: Value) -> Result<I> {
    value.downcast::<I>().map_err(|value| {
        ExecutionError::unexpected_value(
            stage,
            TypeInfo::of::<I>().name(),
            value.type_info().name(),
        )
        .into()
    })
}

pub(crate) fn downcast_output<O: Datum>(stage: &str, value: Value) -> Result<O> {
    downcast_input::<O>(stage, value)
}
