//! Directory-backed context
//!
//! Every stage reads its inputs from a numbered folder under the context root
//! and writes its outputs into the next one:
//!
//! ```text
//! root/
//! ├── stage_0/   inputs of stage 0
//! ├── stage_1/   outputs of stage 0, inputs of stage 1
//! └── stage_2/   outputs of stage 1
//! ```
//!
//! Values are stored one per file through a [`Codec`]. Files are read in
//! lexicographic order of their names, and only when the stage asks for the
//! next input.

use crate::Error;
use crate::Result;
use crate::codec::{Codec, JsonCodec};
use crate::config::{EngineConfig, FileSystemConfig};
use crate::enhance::{
    EnhancedPipeline, InputStream, ResultPosition, StageEnhancer, StageInput, StageLifter,
    StagePosition,
};
use crate::error::IoError;
use crate::pipeline::{DynStage, Pipeline};
use crate::types::{Datum, TypeInfo, Value};
use log::trace;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::{self, Debug};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Chooses the file name, without extension, of one stage output
pub type OutputNaming = Arc<dyn Fn(&Value, &ResultPosition<'_>) -> String + Send + Sync>;

/// `{source}_{index}`; unique within an output folder because input names are
fn default_output_name(_result: &Value, position: &ResultPosition<'_>) -> String {
    format!("{}_{}", position.source, position.index)
}

/// The directory a filesystem pipeline works in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemContext {
    root: PathBuf,
}

impl FileSystemContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `subfolder` under the root
    pub fn folder(&self, subfolder: &str) -> PathBuf {
        self.root.join(subfolder)
    }
}

/// Enhancer reading inputs from one folder and writing outputs to another
#[derive(Clone)]
pub struct FileSystemEnhancer {
    stage: DynStage,
    position: StagePosition,
    input_subfolder: String,
    output_subfolder: String,
    codec: Arc<dyn Codec>,
    naming: OutputNaming,
    source_label: String,
}

impl Debug for FileSystemEnhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemEnhancer")
            .field("stage", &self.stage.name())
            .field("position", &self.position)
            .field("input_subfolder", &self.input_subfolder)
            .field("output_subfolder", &self.output_subfolder)
            .field("extension", &self.codec.extension())
            .finish_non_exhaustive()
    }
}

impl FileSystemEnhancer {
    /// Enhancer using the default folder layout
    pub fn new(stage: DynStage, position: StagePosition, codec: Arc<dyn Codec>) -> Self {
        Self::with_config(stage, position, codec, &FileSystemConfig::default())
    }

    /// Enhancer whose folder names and producer label come from `config`
    pub fn with_config(
        stage: DynStage,
        position: StagePosition,
        codec: Arc<dyn Codec>,
        config: &FileSystemConfig,
    ) -> Self {
        Self {
            stage,
            position,
            input_subfolder: config.stage_folder(position.index),
            output_subfolder: config.stage_folder(position.index + 1),
            codec,
            naming: Arc::new(default_output_name),
            source_label: config.source_label.clone(),
        }
    }

    pub fn with_input_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.input_subfolder = subfolder.into();
        self
    }

    pub fn with_output_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.output_subfolder = subfolder.into();
        self
    }

    /// Replace the output file naming strategy
    pub fn with_output_naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&Value, &ResultPosition<'_>) -> String + Send + Sync + 'static,
    {
        self.naming = Arc::new(naming);
        self
    }

    pub fn input_subfolder(&self) -> &str {
        &self.input_subfolder
    }

    pub fn output_subfolder(&self) -> &str {
        &self.output_subfolder
    }
}

impl StageEnhancer<FileSystemContext> for FileSystemEnhancer {
    fn stage(&self) -> &DynStage {
        &self.stage
    }

    fn position(&self) -> StagePosition {
        self.position
    }

    fn prepare(&self, context: &mut FileSystemContext) -> Result<()> {
        let folder = context.folder(&self.output_subfolder);
        fs::create_dir_all(&folder).map_err(|e| IoError::at(&folder, e))?;
        Ok(())
    }

    fn generate_inputs(&self, context: &FileSystemContext) -> Result<InputStream> {
        let folder = context.folder(&self.input_subfolder);
        let extension = self.codec.extension();

        let mut files = Vec::new();
        for entry in fs::read_dir(&folder).map_err(|e| IoError::at(&folder, e))? {
            let path = entry.map_err(|e| IoError::at(&folder, e))?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
                files.push(path);
            } else {
                trace!("Skipping {}", path.display());
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        trace!("Found {} input file(s) in {}", files.len(), folder.display());

        let codec = Arc::clone(&self.codec);
        let target = self.stage.input_type();
        Ok(Box::new(
            files
                .into_iter()
                .map(move |path| read_input(codec.as_ref(), &path, target)),
        ))
    }

    fn process_output(
        &self,
        context: &mut FileSystemContext,
        result: Value,
        position: &ResultPosition<'_>,
    ) -> Result<()> {
        let name = (self.naming)(&result, position);
        let path = context
            .folder(&self.output_subfolder)
            .join(format!("{name}.{}", self.codec.extension()));

        let bytes = self.codec.encode(&result)?;
        fs::write(&path, &bytes).map_err(|e| IoError::at(&path, e))?;
        trace!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    fn source_label(&self) -> &str {
        &self.source_label
    }
}

/// Read and decode one input file, labelled with its stem
///
/// Stems must be valid UTF-8; lossy labels could send two inputs to the same
/// output files.
fn read_input(codec: &dyn Codec, path: &Path, target: TypeInfo) -> Result<StageInput> {
    let Some(label) = path.file_stem().and_then(|stem| stem.to_str()) else {
        let reason = io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8");
        return Err(IoError::at(path, reason).into());
    };

    let bytes = fs::read(path).map_err(|e| IoError::at(path, e))?;
    trace!("Read {} ({} bytes)", path.display(), bytes.len());

    let value = codec.decode(&bytes, target).map_err(|e| match e {
        Error::Codec(codec_error) => Error::Codec(codec_error.with_path(path)),
        other => other,
    })?;
    Ok(StageInput::new(value, label))
}

/// Lifts stages into [`FileSystemEnhancer`]s sharing one codec and layout
#[derive(Clone, Default)]
pub struct FileSystemLifter {
    json: JsonCodec,
    codec: Option<Arc<dyn Codec>>,
    config: FileSystemConfig,
    naming: Option<OutputNaming>,
}

impl Debug for FileSystemLifter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemLifter")
            .field("json", &self.json)
            .field("custom_codec", &self.codec.is_some())
            .field("config", &self.config)
            .field("custom_naming", &self.naming.is_some())
            .finish()
    }
}

impl FileSystemLifter {
    /// The configured codec, or JSON with the configured indentation
    fn codec(&self) -> Arc<dyn Codec> {
        match &self.codec {
            Some(codec) => Arc::clone(codec),
            None => Arc::new(self.json.clone().pretty(self.config.pretty_json)),
        }
    }
}

impl StageLifter<FileSystemContext> for FileSystemLifter {
    type Enhancer = FileSystemEnhancer;

    fn lift(&self, stage: DynStage, position: StagePosition) -> FileSystemEnhancer {
        let enhancer = FileSystemEnhancer::with_config(stage, position, self.codec(), &self.config);
        match &self.naming {
            Some(naming) => FileSystemEnhancer {
                naming: Arc::clone(naming),
                ..enhancer
            },
            None => enhancer,
        }
    }
}

/// A pipeline whose stages exchange data through a directory tree
pub type FileSystemPipeline = EnhancedPipeline<FileSystemContext, FileSystemLifter>;

impl EnhancedPipeline<FileSystemContext, FileSystemLifter> {
    /// Couple `pipeline` to the directory `root`
    ///
    /// Values are stored as JSON, compact unless the configuration asks for
    /// indentation, until another codec is set.
    pub fn new<I: Datum, O: Datum>(root: impl Into<PathBuf>, pipeline: Pipeline<I, O>) -> Self {
        Self::with_lifter(
            pipeline,
            FileSystemContext::new(root),
            FileSystemLifter::default(),
        )
    }

    /// Teach the default JSON codec about `T`
    pub fn register<T>(mut self) -> Self
    where
        T: Datum + Serialize + DeserializeOwned,
    {
        self.lifter.json = self.lifter.json.register::<T>();
        self
    }

    /// Store values through `codec` instead of the default JSON codec
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.lifter.codec = Some(Arc::new(codec));
        self
    }

    /// Apply the filesystem section of `config`
    pub fn with_config(mut self, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        self.lifter.config = config.filesystem.clone();
        Ok(self)
    }

    /// Replace the output file naming strategy of every stage
    pub fn with_output_naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&Value, &ResultPosition<'_>) -> String + Send + Sync + 'static,
    {
        self.lifter.naming = Some(Arc::new(naming));
        self
    }

    pub fn root(&self) -> &Path {
        self.context.root()
    }
}
