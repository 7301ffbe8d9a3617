//! Context enhancement
//!
//! An enhancer binds one stage to a shared context. The context decides where
//! the stage's inputs come from and where its outputs go, so the same stages
//! can run against memory, a directory tree or anything else without knowing
//! about it.
//!
//! Stage `i` reads from the context's collection `i` and writes into
//! collection `i + 1`. The last stage writes into a collection nobody reads.

use crate::Result;
use crate::error::ExecutionError;
use crate::pipeline::DynStage;
use crate::types::Value;
use log::debug;

mod enhanced;
pub mod memory;

pub use enhanced::EnhancedPipeline;
pub use memory::{ContextSlots, MemoryContext, MemoryPipeline, SlotEnhancer, SlotLifter};

/// Label given to values emitted by a stage's producer
pub const DEFAULT_SOURCE_LABEL: &str = "produced";

/// Where a stage sits in its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePosition {
    /// Zero-based index of the stage
    pub index: usize,
    /// Number of stages in the pipeline
    pub count: usize,
}

impl StagePosition {
    /// Whether this is the first stage
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Whether this is the last stage
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }
}

/// One input sourced from a context
#[derive(Debug, Clone)]
pub struct StageInput {
    pub value: Value,
    /// Where the input came from, such as a file stem or a slot entry
    pub label: String,
}

impl StageInput {
    pub fn new(value: Value, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }
}

/// Position of one result within the invocation that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultPosition<'a> {
    /// Zero-based index of the result
    pub index: usize,
    /// Number of results the invocation returned
    pub count: usize,
    /// Label of the input the invocation ran on
    pub source: &'a str,
}

/// Lazily generated inputs of a stage
///
/// The stream does not borrow the context, which stays free to absorb
/// outputs while inputs are still being read.
pub type InputStream = Box<dyn Iterator<Item = Result<StageInput>>>;

/// A stage bound to a shared context of type `C`
pub trait StageEnhancer<C> {
    /// The wrapped stage
    fn stage(&self) -> &DynStage;

    /// Where the wrapped stage sits in its pipeline
    fn position(&self) -> StagePosition;

    /// Called once before any input is generated
    fn prepare(&self, context: &mut C) -> Result<()> {
        let _ = context;
        Ok(())
    }

    /// Source the stage's inputs from the context
    fn generate_inputs(&self, context: &C) -> Result<InputStream>;

    /// Route one output of the stage into the context
    fn process_output(
        &self,
        context: &mut C,
        result: Value,
        position: &ResultPosition<'_>,
    ) -> Result<()>;

    /// Label used as the source of producer output
    fn source_label(&self) -> &str {
        DEFAULT_SOURCE_LABEL
    }

    /// Run the wrapped stage against the context
    ///
    /// A source stage (producer, no transformer) runs exactly once without
    /// an input and its inputs are never generated. Any other stage runs once
    /// per generated input, exactly as an in-memory pipeline would call it,
    /// so a producer next to a transformer contributes on every invocation.
    /// Failures carry the stage index and, when known, the label of the
    /// input being processed.
    fn run(&self, context: &mut C) -> Result<()> {
        let stage = self.stage();
        let StagePosition { index, count } = self.position();
        let fail = |label: Option<&str>, e| {
            ExecutionError::stage_failed(index, stage.name(), label, e)
        };

        self.prepare(context).map_err(|e| fail(None, e))?;
        debug!("Enhanced stage {}/{count} '{}' starting", index + 1, stage.name());

        let mut inputs = 0usize;
        let mut outputs = 0usize;

        if stage.is_source() {
            let source = self.source_label();
            let results = stage.run(None).map_err(|e| fail(Some(source), e))?;
            outputs += deliver(self, context, results, source)
                .map_err(|e| fail(Some(source), e))?;
        } else {
            for input in self.generate_inputs(context).map_err(|e| fail(None, e))? {
                let StageInput { value, label } = input.map_err(|e| fail(None, e))?;
                let label = label.as_str();
                inputs += 1;

                let results = stage.run(Some(value)).map_err(|e| fail(Some(label), e))?;
                outputs += deliver(self, context, results, label)
                    .map_err(|e| fail(Some(label), e))?;
            }
        }

        debug!(
            "Enhanced stage {}/{count} '{}' finished: {inputs} input(s), {outputs} output(s)",
            index + 1,
            stage.name()
        );
        Ok(())
    }
}

/// Hand every result of one invocation to the enhancer
fn deliver<C, E>(enhancer: &E, context: &mut C, results: Vec<Value>, source: &str) -> Result<usize>
where
    E: StageEnhancer<C> + ?Sized,
{
    let count = results.len();
    for (index, result) in results.into_iter().enumerate() {
        enhancer.process_output(context, result, &ResultPosition { index, count, source })?;
    }
    Ok(count)
}

/// Turns the stages of a pipeline into enhancers
pub trait StageLifter<C> {
    type Enhancer: StageEnhancer<C>;

    fn lift(&self, stage: DynStage, position: StagePosition) -> Self::Enhancer;
}

impl<C, E, F> StageLifter<C> for F
where
    F: Fn(DynStage, StagePosition) -> E,
    E: StageEnhancer<C>,
{
    type Enhancer = E;

    fn lift(&self, stage: DynStage, position: StagePosition) -> E {
        self(stage, position)
    }
}
