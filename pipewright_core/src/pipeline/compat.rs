//! Stage compatibility checks
//!
//! Stages declare the types they accept and emit. These checks compare the
//! declarations of neighbouring stages once, when a chain or pipeline is
//! built, so that a badly assembled pipeline never starts running.

use super::DynStage;
use crate::Result;
use crate::error::ValidationError;
use crate::types::TypeInfo;

/// Whether values of type `output` may be handed to a stage accepting `input`
///
/// Types are compared after monomorphisation, so a stage written over a type
/// parameter is checked against the concrete type it was instantiated with.
pub fn is_compatible(output: TypeInfo, input: TypeInfo) -> bool {
    output == input
}

/// Check that `earlier` can feed `later`
///
/// `position` is the index of `earlier` within its chain and is reported in
/// the error.
pub fn check_pair(position: usize, earlier: &DynStage, later: &DynStage) -> Result<()> {
    if is_compatible(earlier.output_type(), later.input_type()) {
        return Ok(());
    }
    Err(ValidationError::type_mismatch(
        position,
        earlier.name(),
        earlier.output_type().name(),
        later.name(),
        later.input_type().name(),
    )
    .into())
}

/// Check every adjacent pair of `stages`, reporting the first mismatch
pub fn check_chain(stages: &[DynStage]) -> Result<()> {
    stages
        .windows(2)
        .enumerate()
        .try_for_each(|(position, pair)| check_pair(position, &pair[0], &pair[1]))
}

/// Check a whole pipeline from `input` through `stages` to `output`
///
/// Mismatches at the ends are reported against the pseudo-stages
/// `pipeline input` and `pipeline output`.
pub fn check_pipeline(input: TypeInfo, stages: &[DynStage], output: TypeInfo) -> Result<()> {
    let (Some(first), Some(last)) = (stages.first(), stages.last()) else {
        return Err(ValidationError::invalid_parameter(
            "stages",
            "a pipeline needs at least one stage",
        )
        .into());
    };

    if !is_compatible(input, first.input_type()) {
        return Err(ValidationError::type_mismatch(
            0,
            "pipeline input",
            input.name(),
            first.name(),
            first.input_type().name(),
        )
        .into());
    }

    check_chain(stages)?;

    if !is_compatible(last.output_type(), output) {
        return Err(ValidationError::type_mismatch(
            stages.len() - 1,
            last.name(),
            last.output_type().name(),
            "pipeline output",
            output.name(),
        )
        .into());
    }

    Ok(())
}
