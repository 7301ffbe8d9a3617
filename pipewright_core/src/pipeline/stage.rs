//! The typed stage
//!
//! A [`Stage`] is a "fat function" `I -> [O]` assembled from up to three
//! optional operations: a producer that emits values out of nothing, a
//! transformer that maps one input to any number of outputs, and a consumer
//! that observes every output for side effects.

use crate::Result;
use crate::error::{ExecutionError, ValidationError};
use crate::types::{Datum, TypeInfo, Value};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

type Producer<O> = Arc<dyn Fn() -> Result<Vec<O>> + Send + Sync>;
type Transformer<I, O> = Arc<dyn Fn(I) -> Result<Vec<O>> + Send + Sync>;
type Consumer<O> = Arc<dyn Fn(&O) -> Result<()> + Send + Sync>;

/// Everything a stage does once its operations are fixed
pub(crate) type Runner<I, O> = Arc<dyn Fn(Option<I>) -> Result<Vec<O>> + Send + Sync>;

/// Declared input and output types of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSignature {
    pub input: TypeInfo,
    pub output: TypeInfo,
}

impl StageSignature {
    /// Signature of a stage from `I` to `O`
    pub fn of<I: 'static, O: 'static>() -> Self {
        Self {
            input: TypeInfo::of::<I>(),
            output: TypeInfo::of::<O>(),
        }
    }
}

/// A typed unit of work from `I` to a sequence of `O`
pub struct Stage<I, O> {
    pub(crate) name: String,
    pub(crate) has_producer: bool,
    pub(crate) has_transformer: bool,
    pub(crate) runner: Runner<I, O>,
}

impl<I, O> Clone for Stage<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            has_producer: self.has_producer,
            has_transformer: self.has_transformer,
            runner: Arc::clone(&self.runner),
        }
    }
}

impl<I: 'static, O: 'static> Debug for Stage<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("signature", &StageSignature::of::<I, O>())
            .field("has_producer", &self.has_producer)
            .field("has_transformer", &self.has_transformer)
            .finish()
    }
}

impl<I: Datum, O: Datum> Stage<I, O> {
    /// Start describing a stage
    pub fn builder() -> StageBuilder<I, O> {
        StageBuilder::new()
    }

    /// A stage whose only operation is `transform`
    pub fn from_transform<F, R>(transform: F) -> Self
    where
        F: Fn(I) -> Result<R> + Send + Sync + 'static,
        R: IntoIterator<Item = O>,
    {
        StageBuilder::new().transform(transform).assemble()
    }

    /// A stage whose only operation is `produce`
    pub fn from_produce<F, R>(produce: F) -> Self
    where
        F: Fn() -> Result<R> + Send + Sync + 'static,
        R: IntoIterator<Item = O>,
    {
        StageBuilder::new().produce(produce).assemble()
    }

    /// Human-readable name used in logs and errors
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the stage
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declared input and output types
    pub fn signature(&self) -> StageSignature {
        StageSignature::of::<I, O>()
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
    ///
    /// Only a stage with a producer and no transformer qualifies; a stage
    /// without either echoes its input.
    pub fn is_source(&self) -> bool {
        self.has_producer && !self.has_transformer
    }

    /// Run the stage
    ///
    /// Produced values come first, then the transformed input. A stage with
    /// neither operation echoes `input`. The consumer sees every result
    /// before it is returned.
    pub fn run(&self, input: Option<I>) -> Result<Vec<O>> {
        (self.runner)(input)
    }

    /// Run the stage with an input
    pub fn call(&self, input: I) -> Result<Vec<O>> {
        self.run(Some(input))
    }

    /// Run the stage without an input; only the producer contributes
    pub fn produce(&self) -> Result<Vec<O>> {
        self.run(None)
    }
}

impl<T: Datum> Stage<T, T> {
    /// The stage that returns its input unchanged
    pub fn identity() -> Self {
        StageBuilder::new().name("identity").assemble()
    }
}

/// Builder for [`Stage`]
pub struct StageBuilder<I, O> {
    name: Option<String>,
    producer: Option<Producer<O>>,
    transformer: Option<Transformer<I, O>>,
    consumer: Option<Consumer<O>>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I: Datum, O: Datum> Default for StageBuilder<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Datum, O: Datum> StageBuilder<I, O> {
    /// Create a builder with no operations
    pub fn new() -> Self {
        Self {
            name: None,
            producer: None,
            transformer: None,
            consumer: None,
            _types: PhantomData,
        }
    }

    /// Set the stage name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the producer
    pub fn produce<F, R>(mut self, produce: F) -> Self
    where
        F: Fn() -> Result<R> + Send + Sync + 'static,
        R: IntoIterator<Item = O>,
    {
        self.producer = Some(Arc::new(move || {
            produce().map(|values| values.into_iter().collect())
        }));
        self
    }

    /// Set the transformer
    pub fn transform<F, R>(mut self, transform: F) -> Self
    where
        F: Fn(I) -> Result<R> + Send + Sync + 'static,
        R: IntoIterator<Item = O>,
    {
        self.transformer = Some(Arc::new(move |input| {
            transform(input).map(|values| values.into_iter().collect())
        }));
        self
    }

    /// Set the consumer
    pub fn consume<F>(mut self, consume: F) -> Self
    where
        F: Fn(&O) -> Result<()> + Send + Sync + 'static,
    {
        self.consumer = Some(Arc::new(consume));
        self
    }

    /// Build the stage
    ///
    /// A stage without producer and transformer echoes its input, which only
    /// makes sense when `I` and `O` are the same type.
    pub fn build(self) -> Result<Stage<I, O>> {
        if self.producer.is_none() && self.transformer.is_none() {
            let signature = StageSignature::of::<I, O>();
            if signature.input != signature.output {
                let name = self.name.unwrap_or_else(default_name::<I, O>);
                return Err(ValidationError::type_mismatch(
                    0,
                    &name,
                    signature.input.name(),
                    &name,
                    signature.output.name(),
                )
                .into());
            }
        }
        Ok(self.assemble())
    }

    /// Assemble without checking the identity rule
    pub(crate) fn assemble(self) -> Stage<I, O> {
        let name = self.name.unwrap_or_else(default_name::<I, O>);
        let has_producer = self.producer.is_some();
        let has_transformer = self.transformer.is_some();
        let producer = self.producer;
        let transformer = self.transformer;
        let consumer = self.consumer;
        let stage_name = name.clone();

        let runner: Runner<I, O> = Arc::new(move |input: Option<I>| {
            let mut results = Vec::new();

            if let Some(produce) = &producer {
                results.extend(produce()?);
            }

            match (&transformer, input) {
                (Some(transform), Some(input)) => results.extend(transform(input)?),
                (None, Some(input)) if producer.is_none() => {
                    results.push(echo::<I, O>(&stage_name, input)?);
                }
                _ => {}
            }

            if let Some(consume) = &consumer {
                for result in &results {
                    consume(result)?;
                }
            }

            Ok(results)
        });

        Stage {
            name,
            has_producer,
            has_transformer,
            runner,
        }
    }
}

/// Pass an input through a stage that declares the same input and output type
fn echo<I: Datum, O: Datum>(stage: &str, input: I) -> Result<O> {
    Value::new(input).downcast::<O>().map_err(|value| {
        ExecutionError::unexpected_value(
            stage,
            TypeInfo::of::<O>().name(),
            value.type_info().name(),
        )
        .into()
    })
}

fn default_name<I: 'static, O: 'static>() -> String {
    format!(
        "Stage[{} -> {}]",
        short_type_name(std::any::type_name::<I>()),
        short_type_name(std::any::type_name::<O>())
    )
}

/// Strip module paths from a type name, keeping generic structure
pub(crate) fn short_type_name(full_name: &str) -> String {
    let mut short = String::with_capacity(full_name.len());
    let mut segment = String::new();
    for ch in full_name.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            short.push_str(segment.rsplit("::").next().unwrap_or(&segment));
            segment.clear();
            short.push(ch);
        }
    }
    short.push_str(segment.rsplit("::").next().unwrap_or(&segment));
    short
}
