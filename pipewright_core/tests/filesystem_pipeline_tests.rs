//! Integration tests for pipelines coupled to a directory tree

use pipewright_core::error::{CodecError, ExecutionError};
use pipewright_core::{
    Codec, ConfigLoader, DynStage, EngineConfig, EnhancedPipeline, Error, FileSystemContext,
    FileSystemEnhancer, FileSystemPipeline, Pipeline, Stage, StagePosition,
};
use pipewright_test_utils::fixtures::{produce_initial, to_intermediate, to_intermediate2};
use pipewright_test_utils::{
    EnhancerEvent, EventLog, Initial, Intermediate, Intermediate2, RecordingLifter, TempRootBuilder,
    fixture_codec,
};
use std::sync::{Arc, Mutex};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn collecting_sink() -> (Stage<Intermediate2, Intermediate2>, Arc<Mutex<Vec<u32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let stage = Stage::<Intermediate2, Intermediate2>::builder()
        .name("final")
        .consume(move |record| {
            sink.lock().unwrap().push(record.id);
            Ok(())
        })
        .build()
        .unwrap();
    (stage, seen)
}

#[test]
fn test_four_stage_filesystem_pipeline() {
    init_logging();
    let root = TempRootBuilder::new().build();
    let (last, seen) = collecting_sink();
    let pipeline = Pipeline::<(), Intermediate2>::builder()
        .add_stage(produce_initial(3))
        .add_stage(to_intermediate())
        .add_stage(to_intermediate2())
        .add_stage(last)
        .build()
        .unwrap();

    let mut fs_pipeline =
        FileSystemPipeline::new(root.path(), pipeline).with_codec(fixture_codec());
    fs_pipeline.run().unwrap();

    assert!(root.files_in(0).is_empty());
    assert_eq!(
        root.files_in(1),
        ["produced_0.json", "produced_1.json", "produced_2.json"]
    );
    assert_eq!(root.read_json::<Initial>(1, "produced_1"), Initial::new(2, 2));
    assert_eq!(
        root.read_json::<Intermediate>(2, "produced_2_0"),
        Intermediate {
            id: 3,
            value: "3".to_string()
        }
    );
    assert_eq!(
        root.read_json::<Intermediate2>(3, "produced_0_0_0").value,
        "1_1"
    );
    assert_eq!(root.files_in(4).len(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_seeded_inputs_are_processed_in_name_order() {
    let root = TempRootBuilder::new()
        .with_json(0, "b", &Initial::new(2, 20))
        .with_json(0, "a", &Initial::new(1, 10))
        .with_raw(0, "README.md", "not an input")
        .build();

    let pipeline = Pipeline::<Initial, Intermediate>::new([to_intermediate().into_dyn()]).unwrap();
    let log = EventLog::new();
    let codec: Arc<dyn Codec> = Arc::new(fixture_codec());
    let lifter = move |stage: DynStage, position: StagePosition| {
        FileSystemEnhancer::new(stage, position, Arc::clone(&codec))
    };
    let mut fs_pipeline = EnhancedPipeline::with_lifter(
        pipeline,
        FileSystemContext::new(root.path()),
        RecordingLifter::new(lifter, log.clone()),
    );
    fs_pipeline.run().unwrap();

    assert_eq!(root.files_in(1), ["a_0.json", "b_0.json"]);
    assert_eq!(root.read_json::<Intermediate>(1, "b_0").value, "20");
    assert!(log.events().contains(&EnhancerEvent::GenerateInputs { stage: 0 }));

    let sources: Vec<String> = log
        .outputs_of(0)
        .into_iter()
        .filter_map(|e| match e {
            EnhancerEvent::Output { source, .. } => Some(source),
            _ => None,
        })
        .collect();
    assert_eq!(sources, ["a", "b"]);
}

#[test]
fn test_decode_failure_names_file_and_keeps_earlier_outputs() {
    init_logging();
    let root = TempRootBuilder::new()
        .with_json(0, "1", &Initial::new(1, 1))
        .with_raw(0, "2.json", "{\"id\": \"not a number\"}")
        .with_json(0, "3", &Initial::new(3, 3))
        .build();

    let pipeline = Pipeline::<Initial, Intermediate>::new([to_intermediate().into_dyn()]).unwrap();
    let error = FileSystemPipeline::new(root.path(), pipeline)
        .with_codec(fixture_codec())
        .run()
        .unwrap_err();

    assert!(matches!(
        error,
        Error::Execution(ExecutionError::StageFailed { index: 0, .. })
    ));
    match error.root_cause() {
        Error::Codec(CodecError::Decode { path, .. }) => {
            assert_eq!(path.as_deref(), Some(root.stage_dir(0).join("2.json").as_path()));
        }
        other => panic!("Expected decode error, got {other:?}"),
    }

    // the first file was fully processed, the third was never reached
    assert_eq!(root.files_in(1), ["1_0.json"]);
}

#[test]
fn test_loaded_config_drives_layout() {
    let root = TempRootBuilder::new().with_prefix("step-").build();
    let config_file = root.path().join("pipewright.toml");
    std::fs::write(
        &config_file,
        "[filesystem]\ninput_prefix = \"step-\"\nsource_label = \"origin\"\n",
    )
    .unwrap();
    let config: EngineConfig = ConfigLoader::with_path(&config_file).load().unwrap();

    let pipeline = Pipeline::<(), Initial>::new([produce_initial(2).into_dyn()]).unwrap();
    FileSystemPipeline::new(root.path(), pipeline)
        .with_codec(fixture_codec())
        .with_config(&config)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(root.files_in(1), ["origin_0.json", "origin_1.json"]);
}

#[test]
fn test_invalid_config_is_rejected_before_running() {
    let root = TempRootBuilder::new().build();
    let mut config = EngineConfig::default();
    config.filesystem.source_label.clear();

    let pipeline = Pipeline::<(), Initial>::new([produce_initial(1).into_dyn()]).unwrap();
    let result = FileSystemPipeline::new(root.path(), pipeline).with_config(&config);
    assert!(result.err().is_some_and(|e| e.is_construction_error()));
    assert!(root.files_in(1).is_empty());
}
