//! # Ingestion Errors
//!
//! Every failure inside an upload or a batch ingestion. The engine
//! boundaries turn these into failed [`OperationStatus`](dmf_core::OperationStatus)
//! values. Nothing here escapes a public `upload_file` or
//! `ingest_directory` call.

use std::path::PathBuf;

use dmf_core::{ErrorKind, ParseError, Principal, RepositoryError};
use thiserror::Error;

/// Failure inside the upload or ingestion engines.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A repository call failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Property extraction from a file failed.
    #[error("failed to parse {file}: {source}")]
    Parse {
        /// Display name of the file.
        file: String,
        /// The parser's error.
        #[source]
        source: ParseError,
    },

    /// A local file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The target document is checked out by someone else.
    #[error("you do not have permission to overwrite locked file {path} (checked out by {owner})")]
    LockedByOther {
        /// Repository path of the document.
        path: String,
        /// Principal holding the checkout.
        owner: Principal,
    },

    /// A file upload inside a batch returned a failed status.
    #[error("failed to create file {file}: {message}")]
    UploadFailed {
        /// Display name of the file.
        file: String,
        /// Failure classification of the upload.
        kind: ErrorKind,
        /// The upload's failure message.
        message: String,
    },

    /// The artifact-set dependency graph has a cycle.
    #[error("dependency cycle: {}", path.join(" -> "))]
    CycleDetected {
        /// Set keys along the cycle, ending with the repeated key.
        path: Vec<String>,
    },

    /// A set names a dependency with no set in the batch.
    #[error("artifact set {set:?} depends on unknown set {dependency:?}")]
    UnknownDependency {
        /// The depending set.
        set: String,
        /// The missing dependency key.
        dependency: String,
    },

    /// A set depends on a set that already failed in this batch.
    #[error("artifact set {set:?} depends on failed set {dependency:?}")]
    DependencyFailed {
        /// The depending set.
        set: String,
        /// The failed dependency key.
        dependency: String,
    },

    /// The ingestion directory holds no artifact sets.
    #[error("no artifact sets found in {}", dir.display())]
    NoArtifactSets {
        /// The scanned directory.
        dir: PathBuf,
    },
}

impl IngestError {
    /// Map onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository(e) => e.kind(),
            Self::Parse { source, .. } => source.kind(),
            Self::Io { .. } => ErrorKind::IoFailure,
            Self::LockedByOther { .. } => ErrorKind::PermissionDenied,
            Self::UploadFailed { kind, .. } => *kind,
            Self::UnknownDependency { .. } | Self::NoArtifactSets { .. } => ErrorKind::NotFound,
            Self::CycleDetected { .. } | Self::DependencyFailed { .. } => ErrorKind::Unknown,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
