//! # Artifacts
//!
//! [`FileDescriptor`] names one local file to upload. [`ArtifactSet`] is
//! one node of the ingestion dependency graph: the files of a single
//! fitting run, sharing a key.
//!
//! ## File Naming
//!
//! For key `K` the set's files in the ingestion directory are:
//!
//! | File | Content |
//! |------|---------|
//! | `configK.txt` | Fitting configuration. Line 2 lists dependency keys. |
//! | `filelistK.txt` | Input list. Lines 3 and later name input files. |
//! | `dataK_<i>.txt` | Results for input `i`, counted from 0. |
//! | `optresultsK.txt` | Optimisation summary. |

use std::path::{Path, PathBuf};

use dmf_core::{MetadataType, ObjectId, OperationStatus, ParseError};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

const CONFIG_PREFIX: &str = "config";
const TEXT_SUFFIX: &str = ".txt";

/// Characters before the file name on each input-list line.
const INPUT_LINE_PREFIX_LEN: usize = 5;

/// Where an upload's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSource {
    /// A local file, read once per upload.
    Path(PathBuf),
    /// An in-memory buffer.
    Bytes(Vec<u8>),
}

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Content source.
    pub source: FileSource,
    /// Document name in the target folder.
    pub display_name: String,
    /// Selects object type and parser.
    pub metadata_type: MetadataType,
    /// Recorded as `ccsi:parents`.
    pub dependency_ids: Vec<ObjectId>,
}

impl FileDescriptor {
    /// A local file, named after its last path component.
    pub fn from_path(path: impl Into<PathBuf>, metadata_type: MetadataType) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            source: FileSource::Path(path),
            display_name,
            metadata_type,
            dependency_ids: Vec::new(),
        }
    }

    /// An in-memory buffer uploaded as `name`.
    pub fn from_bytes(name: impl Into<String>, metadata_type: MetadataType, data: Vec<u8>) -> Self {
        Self {
            source: FileSource::Bytes(data),
            display_name: name.into(),
            metadata_type,
            dependency_ids: Vec::new(),
        }
    }

    /// Upload under `name` instead.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Record `ids` as this file's parents.
    pub fn with_dependencies(mut self, ids: Vec<ObjectId>) -> Self {
        self.dependency_ids = ids;
        self
    }

    /// Read the whole content.
    pub fn read(&self) -> Result<Vec<u8>, IngestError> {
        match &self.source {
            FileSource::Path(path) => std::fs::read(path).map_err(|e| IngestError::io(path, e)),
            FileSource::Bytes(data) => Ok(data.clone()),
        }
    }
}

/// One fitting run in an ingestion batch.
///
/// Discovery fills in the key and the dependency keys. The resolver
/// attaches the creation status once every file of the set is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    key: String,
    dependencies: Vec<String>,
    status: Option<OperationStatus>,
}

impl ArtifactSet {
    /// A set with explicit dependency keys.
    pub fn new(key: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            key: key.into(),
            dependencies,
            status: None,
        }
    }

    /// The set's key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Keys of the sets this one depends on.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The creation status, once materialized.
    pub fn status(&self) -> Option<&OperationStatus> {
        self.status.as_ref()
    }

    /// Whether every file of the set was uploaded.
    pub fn has_created(&self) -> bool {
        self.status.as_ref().is_some_and(OperationStatus::is_success)
    }

    /// Canonical id of the set: that of its output summary.
    pub fn object_id(&self) -> Option<&ObjectId> {
        self.status.as_ref().and_then(OperationStatus::object_id)
    }

    pub(crate) fn mark_created(&mut self, status: OperationStatus) {
        self.status = Some(status);
    }

    /// `config<key>.txt`
    pub fn config_file(&self) -> String {
        format!("{CONFIG_PREFIX}{}{TEXT_SUFFIX}", self.key)
    }

    /// `filelist<key>.txt`
    pub fn filelist_file(&self) -> String {
        format!("filelist{}{TEXT_SUFFIX}", self.key)
    }

    /// `data<key>_<index>.txt`, `index` counted from 0.
    pub fn results_file(&self, index: usize) -> String {
        format!("data{}_{index}{TEXT_SUFFIX}", self.key)
    }

    /// `optresults<key>.txt`
    pub fn output_file(&self) -> String {
        format!("optresults{}{TEXT_SUFFIX}", self.key)
    }

    /// Input file names listed in the set's `filelist<key>.txt`.
    pub fn read_inputs(&self, dir: &Path) -> Result<Vec<String>, IngestError> {
        let name = self.filelist_file();
        let path = dir.join(&name);
        let content = std::fs::read_to_string(&path).map_err(|e| IngestError::io(&path, e))?;
        parse_input_list(&content).map_err(|source| IngestError::Parse { file: name, source })
    }
}

/// Discover every artifact set in `dir`, ordered by key.
pub fn discover(dir: &Path) -> Result<Vec<ArtifactSet>, IngestError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::io(dir, e))?;
    let mut sets = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| IngestError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(key) = config_key(&name) else {
            continue;
        };
        let path = entry.path();
        let content = std::fs::read_to_string(&path).map_err(|e| IngestError::io(&path, e))?;
        sets.push(ArtifactSet::new(key, dependency_keys(&content)));
    }
    sets.sort_by(|a, b| a.key.cmp(&b.key));
    tracing::debug!(dir = %dir.display(), sets = sets.len(), "discovered artifact sets");
    Ok(sets)
}

/// The key of a `config<key>.txt` file name, ignoring ASCII case of the
/// prefix and suffix.
pub fn config_key(file_name: &str) -> Option<&str> {
    let prefix = file_name.get(..CONFIG_PREFIX.len())?;
    let suffix_start = file_name.len().checked_sub(TEXT_SUFFIX.len())?;
    let suffix = file_name.get(suffix_start..)?;
    if suffix_start < CONFIG_PREFIX.len()
        || !prefix.eq_ignore_ascii_case(CONFIG_PREFIX)
        || !suffix.eq_ignore_ascii_case(TEXT_SUFFIX)
    {
        return None;
    }
    file_name.get(CONFIG_PREFIX.len()..suffix_start)
}

/// Dependency keys from line 2 of a configuration file.
pub fn dependency_keys(config: &str) -> Vec<String> {
    let Some(line) = config.lines().nth(1) else {
        return Vec::new();
    };
    let line = line.trim();
    let line = line.strip_prefix('#').unwrap_or(line);
    line.split_whitespace().map(str::to_string).collect()
}

/// Input names from lines 3 and later of an input list.
fn parse_input_list(content: &str) -> Result<Vec<String>, ParseError> {
    content
        .lines()
        .enumerate()
        .skip(2)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            line.get(INPUT_LINE_PREFIX_LEN..)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .ok_or_else(|| ParseError::MalformedLine {
                    line: index + 1,
                    reason: format!("expected a {INPUT_LINE_PREFIX_LEN}-character prefix and a file name"),
                })
        })
        .collect()
}
