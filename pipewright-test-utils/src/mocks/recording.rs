//! Enhancers that record what they are asked to do

use pipewright_core::Result;
use pipewright_core::enhance::{
    InputStream, ResultPosition, StageEnhancer, StageLifter, StagePosition,
};
use pipewright_core::{DynStage, Value};
use std::sync::{Arc, Mutex};

/// One thing an enhancer did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhancerEvent {
    Prepare { stage: usize },
    GenerateInputs { stage: usize },
    Output {
        stage: usize,
        source: String,
        index: usize,
        count: usize,
    },
}

impl EnhancerEvent {
    /// Index of the stage the event belongs to
    pub fn stage(&self) -> usize {
        match self {
            Self::Prepare { stage }
            | Self::GenerateInputs { stage }
            | Self::Output { stage, .. } => *stage,
        }
    }
}

/// Shared, ordered list of recorded events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<EnhancerEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: EnhancerEvent) {
        self.events.lock().expect("event log poisoned").push(event);
    }

    /// Snapshot of every event so far
    pub fn events(&self) -> Vec<EnhancerEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }

    /// Output events of stage `stage`
    pub fn outputs_of(&self, stage: usize) -> Vec<EnhancerEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, EnhancerEvent::Output { .. }) && e.stage() == stage)
            .collect()
    }
}

/// Wraps an enhancer and records every call made to it
pub struct RecordingEnhancer<E> {
    inner: E,
    log: EventLog,
}

impl<E> RecordingEnhancer<E> {
    pub fn new(inner: E, log: EventLog) -> Self {
        Self { inner, log }
    }
}

impl<C, E: StageEnhancer<C>> StageEnhancer<C> for RecordingEnhancer<E> {
    fn stage(&self) -> &DynStage {
        self.inner.stage()
    }

    fn position(&self) -> StagePosition {
        self.inner.position()
    }

    fn prepare(&self, context: &mut C) -> Result<()> {
        self.log.push(EnhancerEvent::Prepare {
            stage: self.inner.position().index,
        });
        self.inner.prepare(context)
    }

    fn generate_inputs(&self, context: &C) -> Result<InputStream> {
        self.log.push(EnhancerEvent::GenerateInputs {
            stage: self.inner.position().index,
        });
        self.inner.generate_inputs(context)
    }

    fn process_output(
        &self,
        context: &mut C,
        result: Value,
        position: &ResultPosition<'_>,
    ) -> Result<()> {
        self.log.push(EnhancerEvent::Output {
            stage: self.inner.position().index,
            source: position.source.to_string(),
            index: position.index,
            count: position.count,
        });
        self.inner.process_output(context, result, position)
    }

    fn source_label(&self) -> &str {
        self.inner.source_label()
    }
}

/// Wraps a lifter so every enhancer it creates records into one log
pub struct RecordingLifter<L> {
    inner: L,
    log: EventLog,
}

impl<L> RecordingLifter<L> {
    pub fn new(inner: L, log: EventLog) -> Self {
        Self { inner, log }
    }
}

impl<C, L: StageLifter<C>> StageLifter<C> for RecordingLifter<L> {
    type Enhancer = RecordingEnhancer<L::Enhancer>;

    fn lift(&self, stage: DynStage, position: StagePosition) -> Self::Enhancer {
        RecordingEnhancer::new(self.inner.lift(stage, position), self.log.clone())
    }
}
