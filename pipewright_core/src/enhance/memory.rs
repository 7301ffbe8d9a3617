//! In-memory context made of numbered slots
//!
//! Slot `0` holds the initial inputs. Stage `i` reads slot `i` and appends
//! its outputs to slot `i + 1`, so after a run every slot holds the complete
//! output of the stage before it.

use super::{
    EnhancedPipeline, InputStream, ResultPosition, StageEnhancer, StageInput, StageLifter,
    StagePosition,
};
use crate::Result;
use crate::pipeline::{DynStage, Pipeline};
use crate::types::{Datum, Value};
use log::trace;
use std::collections::BTreeMap;

/// A context that stores values in numbered collections
pub trait ContextSlots {
    /// Values currently held in slot `index`; empty when the slot was never written
    fn slot(&self, index: usize) -> &[Value];

    /// Append `value` to slot `index`
    fn append(&mut self, index: usize, value: Value);
}

/// Slots backed by an ordered map
#[derive(Debug, Clone, Default)]
pub struct MemoryContext {
    slots: BTreeMap<usize, Vec<Value>>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose slot `0` holds `inputs`
    pub fn with_initial_inputs<T: Datum>(inputs: impl IntoIterator<Item = T>) -> Self {
        let mut context = Self::new();
        for input in inputs {
            context.append(0, Value::new(input));
        }
        context
    }

    /// Values of slot `index` that are of type `T`, in insertion order
    pub fn values<T: Datum>(&self, index: usize) -> Vec<T> {
        self.slot(index)
            .iter()
            .filter_map(|value| value.downcast_ref::<T>().cloned())
            .collect()
    }

    /// Whether slot `index` was ever written
    pub fn contains(&self, index: usize) -> bool {
        self.slots.contains_key(&index)
    }

    /// Indices of every written slot, ascending
    pub fn slot_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.keys().copied()
    }
}

impl ContextSlots for MemoryContext {
    fn slot(&self, index: usize) -> &[Value] {
        self.slots.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    fn append(&mut self, index: usize, value: Value) {
        self.slots.entry(index).or_default().push(value);
    }
}

/// Enhancer moving values from slot `index` to slot `index + 1`
#[derive(Debug, Clone)]
pub struct SlotEnhancer {
    stage: DynStage,
    position: StagePosition,
}

impl SlotEnhancer {
    pub fn new(stage: DynStage, position: StagePosition) -> Self {
        Self { stage, position }
    }
}

impl<C: ContextSlots> StageEnhancer<C> for SlotEnhancer {
    fn stage(&self) -> &DynStage {
        &self.stage
    }

    fn position(&self) -> StagePosition {
        self.position
    }

    fn generate_inputs(&self, context: &C) -> Result<InputStream> {
        let slot = self.position.index;
        let values = context.slot(slot).to_vec();
        trace!("Slot {slot} supplies {} input(s)", values.len());

        Ok(Box::new(
            values
                .into_iter()
                .enumerate()
                .map(move |(entry, value)| {
                    Ok(StageInput::new(value, format!("slot {slot}[{entry}]")))
                }),
        ))
    }

    fn process_output(
        &self,
        context: &mut C,
        result: Value,
        _position: &ResultPosition<'_>,
    ) -> Result<()> {
        context.append(self.position.index + 1, result);
        Ok(())
    }
}

/// Lifts stages into [`SlotEnhancer`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotLifter;

impl<C: ContextSlots> StageLifter<C> for SlotLifter {
    type Enhancer = SlotEnhancer;

    fn lift(&self, stage: DynStage, position: StagePosition) -> SlotEnhancer {
        SlotEnhancer::new(stage, position)
    }
}

/// A pipeline running against a [`MemoryContext`]
pub type MemoryPipeline<C = MemoryContext> = EnhancedPipeline<C, SlotLifter>;

impl<C: ContextSlots> EnhancedPipeline<C, SlotLifter> {
    /// Couple `pipeline` to a slot context
    pub fn new<I: Datum, O: Datum>(pipeline: Pipeline<I, O>, context: C) -> Self {
        Self::with_lifter(pipeline, context, SlotLifter)
    }
}
