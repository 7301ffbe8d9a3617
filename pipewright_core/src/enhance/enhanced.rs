//! Running a whole pipeline against a shared context

use super::{StageEnhancer, StageLifter, StagePosition};
use crate::Result;
use crate::pipeline::{DynStage, Pipeline};
use crate::types::Datum;
use log::debug;

/// A pipeline whose stages exchange data through a shared context
///
/// Each stage is lifted into an enhancer when its turn comes. Stages run
/// strictly in order, so every output of stage `i` is in the context before
/// stage `i + 1` starts. A failure leaves the context as it was at that
/// moment; nothing is rolled back.
pub struct EnhancedPipeline<C, L> {
    pub(crate) stages: Vec<DynStage>,
    pub(crate) context: C,
    pub(crate) lifter: L,
}

impl<C, L> EnhancedPipeline<C, L>
where
    L: StageLifter<C>,
{
    /// Couple the stages of `pipeline` to `context`, lifting them with `lifter`
    pub fn with_lifter<I: Datum, O: Datum>(
        pipeline: Pipeline<I, O>,
        context: C,
        lifter: L,
    ) -> Self {
        Self {
            stages: pipeline.into_stages(),
            context,
            lifter,
        }
    }

    /// Run every stage against the context, in order
    pub fn run(&mut self) -> Result<&C> {
        let count = self.stages.len();
        debug!("Running enhanced pipeline with {count} stage(s)");

        for (index, stage) in self.stages.iter().enumerate() {
            let enhancer = self
                .lifter
                .lift(stage.clone(), StagePosition { index, count });
            enhancer.run(&mut self.context)?;
        }

        Ok(&self.context)
    }

    /// The stages in execution order
    pub fn stages(&self) -> &[DynStage] {
        &self.stages
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }
}
