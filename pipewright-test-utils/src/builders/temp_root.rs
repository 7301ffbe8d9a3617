//! Temporary directory trees laid out the way filesystem pipelines expect

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder seeding stage folders in a fresh temporary directory
pub struct TempRootBuilder {
    prefix: String,
    files: Vec<(usize, String, Vec<u8>)>,
}

impl Default for TempRootBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TempRootBuilder {
    /// Create a builder using the default `stage_` folder prefix
    pub fn new() -> Self {
        Self {
            prefix: "stage_".to_string(),
            files: Vec::new(),
        }
    }

    /// Use a different stage folder prefix
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Add `value` as `{name}.json` in the folder of stage `stage`
    pub fn with_json<T: Serialize>(self, stage: usize, name: &str, value: &T) -> Self {
        let content = serde_json::to_vec(value).expect("fixture values serialize");
        self.with_raw(stage, &format!("{name}.json"), content)
    }

    /// Add a file with arbitrary content in the folder of stage `stage`
    pub fn with_raw(mut self, stage: usize, file_name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((stage, file_name.to_string(), content.into()));
        self
    }

    /// Create the directory and write every seeded file
    pub fn build(self) -> TempRoot {
        let dir = TempDir::new().expect("create temporary directory");
        let root = TempRoot {
            dir,
            prefix: self.prefix,
        };
        for (stage, file_name, content) in self.files {
            let folder = root.stage_dir(stage);
            fs::create_dir_all(&folder).expect("create stage folder");
            fs::write(folder.join(file_name), content).expect("write seeded file");
        }
        root
    }
}

/// A temporary pipeline root, removed when dropped
pub struct TempRoot {
    dir: TempDir,
    prefix: String,
}

impl TempRoot {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Folder of stage `stage`
    pub fn stage_dir(&self, stage: usize) -> PathBuf {
        self.dir.path().join(format!("{}{stage}", self.prefix))
    }

    /// Sorted file names in the folder of stage `stage`; empty when it does not exist
    pub fn files_in(&self, stage: usize) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.stage_dir(stage)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Decode `{name}.json` from the folder of stage `stage`
    pub fn read_json<T: DeserializeOwned>(&self, stage: usize, name: &str) -> T {
        let path = self.stage_dir(stage).join(format!("{name}.json"));
        let bytes = fs::read(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
        serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("decode {}: {e}", path.display()))
    }
}
