//! # Dependency Ingestion
//!
//! Uploads every artifact set of a directory, each after the sets it
//! depends on, so that a set's configuration can record its dependencies'
//! canonical ids as parents.
//!
//! ## Traversal
//!
//! Depth-first over the dependency graph with one memo state per set:
//!
//! ```text
//! Unvisited ──▶ InProgress ──▶ Done(status)
//!                   │
//!                   └────────▶ Failed
//! ```
//!
//! Reaching an `InProgress` set again means the graph has a cycle, which
//! fails with [`IngestError::CycleDetected`] before anything in the cycle
//! is uploaded. A `Done` set reached along a second path is not uploaded
//! again.
//!
//! ## Per-Set Upload Order
//!
//! 1. every input listed in `filelist<key>.txt`;
//! 2. `filelist<key>.txt`, parented on the inputs;
//! 3. `config<key>.txt`, parented on the dependency sets;
//! 4. `data<key>_<i>.txt` per input, parented on filelist and config;
//! 5. `optresults<key>.txt`, parented on filelist, config and all results.
//!
//! The batch stops at the first failure. Memo state is not persisted: a
//! rerun re-attempts everything and relies on checksum deduplication to
//! leave unchanged files alone.

use std::collections::HashMap;
use std::path::Path;

use dmf_core::{MetadataType, ObjectId, OperationStatus};
use dmf_repository::{Connection, Folder, Repository};

use crate::artifact::{discover, ArtifactSet, FileDescriptor};
use crate::error::IngestError;
use crate::folder::resolve_folder;
use crate::options::{IngestOptions, UploadOptions};
use crate::upload::VersionedUploadEngine;

/// Traversal state of one artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetState {
    /// Not reached yet.
    Unvisited,
    /// Its dependencies are being materialized.
    InProgress,
    /// Every file was uploaded.
    Done(OperationStatus),
    /// Materialization failed. Never retried within the batch.
    Failed,
}

/// Result of a batch ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Discovered sets, with creation status attached to those completed.
    pub sets: Vec<ArtifactSet>,
    /// Status of the last set, or the failure, with the batch detail log.
    pub status: OperationStatus,
}

/// Ingests directories of artifact sets in dependency order.
#[derive(Debug, Clone, Default)]
pub struct DependencyIngestionResolver {
    engine: VersionedUploadEngine,
    options: IngestOptions,
}

impl DependencyIngestionResolver {
    /// A resolver with an explicit upload engine and options.
    pub fn new(engine: VersionedUploadEngine, options: IngestOptions) -> Self {
        Self { engine, options }
    }

    /// The batch options.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest every artifact set in `dir`, returning the batch status.
    pub fn ingest_directory<R: Repository>(&self, connection: &Connection<R>, dir: &Path) -> OperationStatus {
        self.ingest(connection, dir).status
    }

    /// Ingest every artifact set in `dir`.
    pub fn ingest<R: Repository>(&self, connection: &Connection<R>, dir: &Path) -> IngestReport {
        let mut detail = format!("uploading files from folder: {}\n\n", dir.display());
        tracing::info!(dir = %dir.display(), target = %self.options.target_folder, "ingesting directory");

        let prepared = discover(dir).and_then(|sets| {
            if sets.is_empty() {
                return Err(IngestError::NoArtifactSets { dir: dir.to_path_buf() });
            }
            let folder = resolve_folder(
                connection.repository(),
                &self.options.target_folder,
                self.options.create_missing_folder,
            )?;
            Ok((sets, folder))
        });
        let (sets, folder) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                detail.push_str(&format!("Failed with error: {e}.\n"));
                return IngestReport {
                    sets: Vec::new(),
                    status: failure(dir, &e, detail),
                };
            }
        };

        let mut batch = Batch::new(&self.engine, &self.options.upload, connection, &folder, dir, sets, detail);
        let result = batch.run();
        let Batch { sets, mut detail, .. } = batch;
        let status = match result {
            Ok(status) => {
                tracing::info!(dir = %dir.display(), sets = sets.len(), "directory ingested");
                status.with_detail(detail)
            }
            Err(e) => {
                if !matches!(e, IngestError::UploadFailed { .. }) {
                    detail.push_str(&format!("Failed with error: {e}.\n"));
                }
                failure(dir, &e, detail)
            }
        };
        IngestReport { sets, status }
    }
}

fn failure(dir: &Path, e: &IngestError, detail: String) -> OperationStatus {
    tracing::error!(dir = %dir.display(), error = %e, "ingestion failed");
    OperationStatus::failure(e.kind(), e.to_string()).with_detail(detail)
}

/// One ingestion run's traversal state.
struct Batch<'a, R> {
    engine: &'a VersionedUploadEngine,
    options: &'a UploadOptions,
    connection: &'a Connection<R>,
    folder: &'a Folder,
    dir: &'a Path,
    sets: Vec<ArtifactSet>,
    /// Lowercased key to position in `sets`.
    index: HashMap<String, usize>,
    states: Vec<SetState>,
    detail: String,
}

impl<'a, R: Repository> Batch<'a, R> {
    fn new(
        engine: &'a VersionedUploadEngine,
        options: &'a UploadOptions,
        connection: &'a Connection<R>,
        folder: &'a Folder,
        dir: &'a Path,
        sets: Vec<ArtifactSet>,
        detail: String,
    ) -> Self {
        let index = sets
            .iter()
            .enumerate()
            .map(|(i, set)| (set.key().to_lowercase(), i))
            .collect();
        let states = vec![SetState::Unvisited; sets.len()];
        Self {
            engine,
            options,
            connection,
            folder,
            dir,
            sets,
            index,
            states,
            detail,
        }
    }

    /// Materialize every set in key order. Returns the last set's status.
    fn run(&mut self) -> Result<OperationStatus, IngestError> {
        let mut last = None;
        for i in 0..self.sets.len() {
            let mut path = Vec::new();
            last = Some(self.materialize(i, &mut path)?);
        }
        last.ok_or_else(|| IngestError::NoArtifactSets {
            dir: self.dir.to_path_buf(),
        })
    }

    fn materialize(&mut self, i: usize, path: &mut Vec<String>) -> Result<OperationStatus, IngestError> {
        let key = self.sets[i].key().to_string();
        match &self.states[i] {
            SetState::Done(status) => return Ok(status.clone()),
            SetState::InProgress => {
                let mut cycle = path.clone();
                cycle.push(key);
                return Err(IngestError::CycleDetected { path: cycle });
            }
            SetState::Failed => {
                return Err(IngestError::DependencyFailed {
                    set: path.last().cloned().unwrap_or_else(|| key.clone()),
                    dependency: key,
                });
            }
            SetState::Unvisited => {}
        }

        self.states[i] = SetState::InProgress;
        path.push(key.clone());
        let result = self.materialize_unvisited(i, path);
        path.pop();

        match &result {
            Ok(status) => {
                tracing::info!(set = %key, object_id = ?status.object_id(), "artifact set created");
                self.sets[i].mark_created(status.clone());
                self.states[i] = SetState::Done(status.clone());
                self.detail.push('\n');
            }
            Err(e) => {
                tracing::warn!(set = %key, error = %e, "artifact set failed");
                self.states[i] = SetState::Failed;
            }
        }
        result
    }

    fn materialize_unvisited(&mut self, i: usize, path: &mut Vec<String>) -> Result<OperationStatus, IngestError> {
        let set = self.sets[i].clone();
        let mut dependency_ids = Vec::with_capacity(set.dependencies().len());
        for dependency in set.dependencies() {
            let j = *self.index.get(&dependency.to_lowercase()).ok_or_else(|| {
                IngestError::UnknownDependency {
                    set: set.key().to_string(),
                    dependency: dependency.clone(),
                }
            })?;
            let status = self.materialize(j, path)?;
            dependency_ids.extend(status.object_id().cloned());
        }
        self.upload_set(&set, dependency_ids)
    }

    fn upload_set(&mut self, set: &ArtifactSet, dependency_ids: Vec<ObjectId>) -> Result<OperationStatus, IngestError> {
        tracing::debug!(set = %set.key(), dependencies = dependency_ids.len(), "uploading artifact set");
        let inputs = set.read_inputs(self.dir)?;

        let mut input_ids = Vec::with_capacity(inputs.len());
        for name in &inputs {
            let file = FileDescriptor::from_path(self.dir.join(name), MetadataType::InputData).named(name.as_str());
            input_ids.push(self.upload(file)?);
        }

        let filelist = self.upload(
            self.local(set.filelist_file(), MetadataType::InputData)
                .with_dependencies(input_ids),
        )?;
        let config = self.upload(
            self.local(set.config_file(), MetadataType::Config)
                .with_dependencies(dependency_ids),
        )?;

        let parents = vec![filelist, config];
        let mut output_parents = parents.clone();
        for index in 0..inputs.len() {
            output_parents.push(self.upload(
                self.local(set.results_file(index), MetadataType::ResultsData)
                    .with_dependencies(parents.clone()),
            )?);
        }

        self.upload_status(
            self.local(set.output_file(), MetadataType::Output)
                .with_dependencies(output_parents),
        )
    }

    fn local(&self, name: String, metadata_type: MetadataType) -> FileDescriptor {
        FileDescriptor::from_path(self.dir.join(&name), metadata_type).named(name)
    }

    /// Upload one file, returning its canonical id.
    fn upload(&mut self, file: FileDescriptor) -> Result<ObjectId, IngestError> {
        let status = self.upload_status(file)?;
        status.object_id().cloned().ok_or_else(|| IngestError::UploadFailed {
            file: status.detail().to_string(),
            kind: dmf_core::ErrorKind::Unknown,
            message: "successful upload reported no object id".into(),
        })
    }

    fn upload_status(&mut self, file: FileDescriptor) -> Result<OperationStatus, IngestError> {
        let status = self
            .engine
            .upload_file(self.connection, self.folder, &file, self.options);
        self.detail.push_str(status.detail());
        self.detail.push('\n');
        if status.is_success() {
            return Ok(status);
        }
        Err(IngestError::UploadFailed {
            file: file.display_name,
            kind: status.error_kind().unwrap_or(dmf_core::ErrorKind::Unknown),
            message: status.message().to_string(),
        })
    }
}
