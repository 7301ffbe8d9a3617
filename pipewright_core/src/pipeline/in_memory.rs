//! In-memory pipeline execution
//!
//! A [`Pipeline`] threads one input through an ordered list of stages. The
//! results of each stage become the inputs of the next one, and every input
//! is handled on its own, so the final result is the flattened output of the
//! last stage.

use super::compat;
use super::dyn_stage::{DynStage, downcast_output};
use super::stage::Stage;
use crate::Result;
use crate::error::ExecutionError;
use crate::types::{Datum, TypeInfo, Value};
use log::{debug, trace};
use std::fmt::{self, Debug};
use std::marker::PhantomData;

/// An ordered, validated sequence of stages from `I` to `O`
pub struct Pipeline<I, O> {
    stages: Vec<DynStage>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O> Clone for Pipeline<I, O> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
            _types: PhantomData,
        }
    }
}

impl<I: 'static, O: 'static> Debug for Pipeline<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("input", &TypeInfo::of::<I>())
            .field("output", &TypeInfo::of::<O>())
            .field("stages", &self.stages)
            .finish()
    }
}

impl<I: Datum, O: Datum> Pipeline<I, O> {
    /// Build a pipeline from `stages`
    ///
    /// An empty list becomes a single identity stage over `I`. Every boundary
    /// is checked here, including the pipeline input against the first stage
    /// and the last stage against the pipeline output.
    pub fn new(stages: impl IntoIterator<Item = DynStage>) -> Result<Self> {
        let mut stages: Vec<DynStage> = stages.into_iter().collect();
        if stages.is_empty() {
            stages.push(Stage::<I, I>::identity().into_dyn());
        }

        compat::check_pipeline(TypeInfo::of::<I>(), &stages, TypeInfo::of::<O>())?;

        debug!(
            "Built pipeline with {} stage(s): [{}]",
            stages.len(),
            stages
                .iter()
                .map(DynStage::name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            stages,
            _types: PhantomData,
        })
    }

    /// Start building a pipeline stage by stage
    pub fn builder() -> PipelineBuilder<I, O> {
        PipelineBuilder::new()
    }

    /// Run every stage over `input` and return the last stage's outputs
    ///
    /// Execution stops at the first failure, which is reported together with
    /// the index and name of the stage that raised it.
    pub fn run(&self, input: I) -> Result<Vec<O>> {
        let mut results = vec![Value::new(input)];

        for (index, stage) in self.stages.iter().enumerate() {
            trace!(
                "Running stage {index} '{}' over {} input(s)",
                stage.name(),
                results.len()
            );

            let mut outputs = Vec::new();
            for value in results {
                let produced = stage
                    .run(Some(value))
                    .map_err(|e| ExecutionError::stage_failed(index, stage.name(), None, e))?;
                outputs.extend(produced);
            }
            results = outputs;
        }

        let last = self.stages.last().map(DynStage::name).unwrap_or("pipeline");
        results
            .into_iter()
            .map(|value| downcast_output::<O>(last, value))
            .collect()
    }

    /// The stages in execution order
    pub fn stages(&self) -> &[DynStage] {
        &self.stages
    }

    /// Number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Give up the pipeline and keep its stages
    pub fn into_stages(self) -> Vec<DynStage> {
        self.stages
    }
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder<I, O> {
    stages: Vec<DynStage>,
    _types: PhantomData<fn(I) -> O>,
}

impl<I: Datum, O: Datum> Default for PipelineBuilder<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Datum, O: Datum> PipelineBuilder<I, O> {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            _types: PhantomData,
        }
    }

    /// Append a stage
    pub fn add_stage(mut self, stage: impl Into<DynStage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    /// Validate the stages and build the pipeline
    pub fn build(self) -> Result<Pipeline<I, O>> {
        Pipeline::new(self.stages)
    }
}
