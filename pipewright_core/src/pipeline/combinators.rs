//! Combinators for composing pipeline stages
//!
//! Chaining fuses two stages into one with flat-map semantics: every output
//! of the first stage is fed to the second stage on its own, and the second
//! stage's outputs are concatenated in the order of the first stage's outputs.

use super::compat;
use super::dyn_stage::{DynStage, ErasedRunner};
use super::stage::{Runner, Stage, StageSignature};
use crate::Result;
use crate::types::Datum;
use std::sync::Arc;

/// Flat-map `second` over the outputs of `first`
fn compose<I, M, O>(first: Runner<I, M>, second: Runner<M, O>) -> Runner<I, O>
where
    I: 'static,
    M: 'static,
    O: 'static,
{
    Arc::new(move |input: Option<I>| {
        let mut outputs = Vec::new();
        for intermediate in first(input)? {
            outputs.extend(second(Some(intermediate))?);
        }
        Ok(outputs)
    })
}

fn chained_name(first: &str, second: &str) -> String {
    format!("{first} >> {second}")
}

impl<I: Datum, O: Datum> Stage<I, O> {
    /// Chain `next` after this stage
    ///
    /// The compiler guarantees that `next` accepts what this stage emits.
    /// The composite keeps this stage's input type and `next`'s output type,
    /// and takes its producer and transformer flags from this stage, which
    /// alone decides what happens to the composite's input.
    pub fn then<P: Datum>(self, next: Stage<O, P>) -> Stage<I, P> {
        Stage {
            name: chained_name(&self.name, &next.name),
            has_producer: self.has_producer,
            has_transformer: self.has_transformer,
            runner: compose(self.runner, next.runner),
        }
    }
}

impl DynStage {
    /// Chain `next` after this stage, checking that the types line up
    pub fn chain(&self, next: &DynStage) -> Result<DynStage> {
        compat::check_pair(0, self, next)?;

        let runner: ErasedRunner = compose(Arc::clone(&self.runner), Arc::clone(&next.runner));
        Ok(DynStage {
            name: Arc::from(chained_name(&self.name, &next.name)),
            signature: StageSignature {
                input: self.signature.input,
                output: next.signature.output,
            },
            has_producer: self.has_producer,
            has_transformer: self.has_transformer,
            runner,
        })
    }
}

/// Extension trait for composing anything that converts into a [`DynStage`]
pub trait StageExt: Into<DynStage> + Sized {
    /// Chain `next` after `self`, checking that the types line up
    fn chain_with(self, next: impl Into<DynStage>) -> Result<DynStage> {
        self.into().chain(&next.into())
    }
}

impl<T: Into<DynStage>> StageExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ValidationError};
    use crate::types::TypeInfo;
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn doubling() -> Stage<i32, i32> {
        Stage::from_transform(|x: i32| Ok([x * 2]))
    }

    fn labelled() -> Stage<i32, String> {
        Stage::from_transform(|x: i32| Ok([format!("Value: {x}")]))
    }

    #[test]
    fn test_transform_only_chain() {
        let combined = doubling().then(labelled());
        assert_eq!(combined.call(3).unwrap(), vec!["Value: 6"]);
    }

    #[test]
    fn test_produce_and_transform_chain() {
        let first = Stage::<i32, i32>::builder()
            .produce(|| Ok([1, 2, 3]))
            .transform(|x| Ok([x * 2]))
            .build()
            .unwrap();
        assert_eq!(first.call(2).unwrap(), vec![1, 2, 3, 4]);

        let combined = first.then(labelled());
        assert_eq!(
            combined.call(2).unwrap(),
            vec!["Value: 1", "Value: 2", "Value: 3", "Value: 4"]
        );
        assert!(combined.has_producer());
    }

    #[test]
    fn test_each_stage_consumes_its_own_outputs() {
        let first_seen = Arc::new(Mutex::new(Vec::new()));
        let second_seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&first_seen), Arc::clone(&second_seen));

        let first = Stage::<i32, i32>::builder()
            .produce(|| Ok([1, 2]))
            .transform(|x| Ok([x + 1]))
            .consume(move |x| {
                a.lock().unwrap().push(*x);
                Ok(())
            })
            .build()
            .unwrap();
        let second = Stage::<i32, String>::builder()
            .transform(|x| Ok([format!("Number: {x}")]))
            .consume(move |s| {
                b.lock().unwrap().push(s.clone());
                Ok(())
            })
            .build()
            .unwrap();

        let result = first.then(second).call(2).unwrap();
        assert_eq!(result, vec!["Number: 1", "Number: 2", "Number: 3"]);
        assert_eq!(*first_seen.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(*second_seen.lock().unwrap(), result);
    }

    #[test]
    fn test_empty_stages_chain_to_identity() {
        let combined = Stage::<i32, i32>::identity().then(Stage::identity());
        assert_eq!(combined.call(5).unwrap(), vec![5]);
    }

    #[test]
    fn test_produce_only_first_stage_ignores_input() {
        let first = Stage::<i32, i32>::from_produce(|| Ok([5, 10]));
        let combined = first.then(Stage::from_transform(|x: i32| Ok([format!("Processed: {x}")])));
        assert_eq!(
            combined.call(0).unwrap(),
            vec!["Processed: 5", "Processed: 10"]
        );
    }

    #[test]
    fn test_second_stage_producer_runs_per_element() {
        let second = Stage::<i32, String>::builder()
            .produce(|| Ok(["injected".to_string()]))
            .transform(|x| Ok([format!("Processed: {x}")]))
            .build()
            .unwrap();

        let combined = doubling().then(second);
        assert_eq!(combined.call(4).unwrap(), vec!["injected", "Processed: 8"]);
    }

    #[test]
    fn test_chained_name() {
        let combined = doubling().named("double").then(labelled().named("label"));
        assert_eq!(combined.name(), "double >> label");
    }

    #[test]
    fn test_dyn_chain_checks_types() {
        let ok = doubling().into_dyn().chain(&labelled().into_dyn()).unwrap();
        assert_eq!(ok.input_type(), TypeInfo::of::<i32>());
        assert_eq!(ok.output_type(), TypeInfo::of::<String>());
        assert_eq!(ok.run_typed::<i32, String>(Some(1)).unwrap(), vec!["Value: 2"]);

        let error = labelled().into_dyn().chain(&doubling().into_dyn()).unwrap_err();
        assert!(matches!(
            error,
            Error::Validation(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_stage_ext_chain_with() {
        let combined = doubling().chain_with(doubling()).unwrap();
        assert_eq!(combined.run_typed::<i32, i32>(Some(3)).unwrap(), vec![12]);
        assert!(doubling().chain_with(Stage::<String, String>::identity()).is_err());
    }

    fn fan_out(n: usize) -> Stage<i32, i32> {
        Stage::from_transform(move |x: i32| {
            Ok((0..n as i32).map(move |k| x.wrapping_mul(31).wrapping_add(k)))
        })
    }

    fn with_producer(values: Vec<i32>) -> Stage<i32, i32> {
        Stage::builder()
            .produce(move || Ok(values.clone()))
            .transform(|x: i32| Ok([x.wrapping_sub(1)]))
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn test_chain_is_associative(
            x in any::<i32>(),
            a in 0usize..4,
            b in 0usize..4,
            produced in proptest::collection::vec(any::<i32>(), 0..4),
        ) {
            let left = fan_out(a).then(with_producer(produced.clone())).then(fan_out(b));
            let right = fan_out(a).then(with_producer(produced).then(fan_out(b)));
            prop_assert_eq!(left.call(x).unwrap(), right.call(x).unwrap());
        }

        #[test]
        fn test_identity_is_neutral(x in any::<i32>(), n in 0usize..5) {
            let stage = fan_out(n);
            let expected = stage.call(x).unwrap();

            prop_assert_eq!(
                Stage::identity().then(stage.clone()).call(x).unwrap(),
                expected.clone()
            );
            prop_assert_eq!(stage.then(Stage::identity()).call(x).unwrap(), expected);
        }
    }
}
