//! Mock implementations for testing

mod recording;

pub use recording::{EnhancerEvent, EventLog, RecordingEnhancer, RecordingLifter};
