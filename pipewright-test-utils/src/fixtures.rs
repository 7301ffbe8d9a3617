//! Record types and stages shared by the integration tests

use pipewright_core::Stage;
use pipewright_core::codec::JsonCodec;
use serde::{Deserialize, Serialize};

/// Record emitted by the first stage of the fixture pipelines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initial {
    pub id: u32,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intermediate {
    pub id: u32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intermediate2 {
    pub id: u32,
    pub value: String,
}

impl Initial {
    pub fn new(id: u32, value: i64) -> Self {
        Self { id, value }
    }
}

/// JSON codec knowing every fixture type
pub fn fixture_codec() -> JsonCodec {
    JsonCodec::new()
        .register::<Initial>()
        .register::<Intermediate>()
        .register::<Intermediate2>()
}

/// Source stage emitting `Initial { id, value: id }` for ids `1..=count`
pub fn produce_initial(count: u32) -> Stage<(), Initial> {
    Stage::from_produce(move || Ok((1..=count).map(|id| Initial::new(id, i64::from(id)))))
        .named("produce-initial")
}

/// `Initial` to `Intermediate`, stringifying the value
pub fn to_intermediate() -> Stage<Initial, Intermediate> {
    Stage::from_transform(|input: Initial| {
        Ok([Intermediate {
            id: input.id,
            value: input.value.to_string(),
        }])
    })
    .named("to-intermediate")
}

/// `Intermediate` to `Intermediate2`, doubling the value as `"{v}_{v}"`
pub fn to_intermediate2() -> Stage<Intermediate, Intermediate2> {
    Stage::from_transform(|input: Intermediate| {
        Ok([Intermediate2 {
            id: input.id,
            value: format!("{0}_{0}", input.value),
        }])
    })
    .named("to-intermediate2")
}
