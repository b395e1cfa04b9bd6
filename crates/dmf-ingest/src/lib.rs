//! # dmf-ingest — Versioned Uploads and Batch Ingestion
//!
//! Moves local files into the repository as versioned documents with
//! type-specific metadata.
//!
//! - [`upload`]: [`VersionedUploadEngine`], one file into one folder,
//!   deduplicated on content checksum.
//! - [`working_copy`]: the checkout held during an update.
//! - [`parser`]: property extraction per [`MetadataType`](dmf_core::MetadataType).
//! - [`artifact`]: file descriptors and artifact-set discovery.
//! - [`resolver`]: [`DependencyIngestionResolver`], a whole directory in
//!   dependency order.
//! - [`folder`]: target folder lookup and creation.
//!
//! Public entry points return an [`OperationStatus`](dmf_core::OperationStatus)
//! and never fail. The `try_*` variants return [`IngestError`].

pub mod artifact;
pub mod error;
pub mod folder;
pub mod options;
pub mod parser;
pub mod properties;
pub mod resolver;
pub mod upload;
pub mod working_copy;

pub use artifact::{discover, ArtifactSet, FileDescriptor, FileSource};
pub use error::IngestError;
pub use folder::{create_folder, resolve_folder, FolderProperties};
pub use options::{IngestOptions, UploadOptions};
pub use parser::{ParserRegistry, PropertyParser};
pub use resolver::{DependencyIngestionResolver, IngestReport, SetState};
pub use upload::{UploadOutcome, Uploaded, VersionedUploadEngine};
pub use working_copy::WorkingCopy;
