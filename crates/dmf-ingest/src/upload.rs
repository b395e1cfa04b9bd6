//! # Versioned Upload
//!
//! Uploads one file into a folder, deduplicating on content checksum.
//!
//! ```text
//!                       ┌── absent ──────────────▶ create 1.0 ───────▶ Created
//! resolve <folder>/<name>
//!                       ├── locked by another ───▶ PermissionDenied
//!                       │
//!                       └── free or held by self ─▶ checkout
//!                                                    │
//!                              same checksum ◀───────┼───────▶ different
//!                                    │                            │
//!                          cancel ─▶ Unchanged             check in ─▶ Updated
//!                                                                 │
//!                                                    failure ─▶ cancel ─▶ Failed
//! ```
//!
//! An administrator session may take over another principal's checkout.
//! Every exit path that acquired or resumed a checkout either checks it in
//! or cancels it.

use std::io::Cursor;
use std::path::PathBuf;

use dmf_core::{Checksum, ChecksumService, ObjectId, OperationStatus, PropertyMap, RepositoryError};
use dmf_repository::{Connection, ContentStream, Document, Folder, Repository, VersioningState};
use serde::{Deserialize, Serialize};

use crate::artifact::FileDescriptor;
use crate::error::IngestError;
use crate::options::UploadOptions;
use crate::parser::ParserRegistry;
use crate::properties::{document_properties, WritePath};
use crate::working_copy::WorkingCopy;

/// Terminal state of a successful upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadOutcome {
    /// A new document was created.
    Created,
    /// A new version was checked in.
    Updated,
    /// The content matched the stored checksum; nothing was written.
    Unchanged,
}

impl std::fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Updated => "UPDATED",
            Self::Unchanged => "UNCHANGED",
        };
        f.write_str(s)
    }
}

/// A successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    /// What the upload did.
    pub outcome: UploadOutcome,
    /// Id of the document version now current, as the repository
    /// returned it.
    pub object_id: ObjectId,
}

/// Uploads files as versioned documents.
#[derive(Debug, Clone, Default)]
pub struct VersionedUploadEngine {
    parsers: ParserRegistry,
    checksums: ChecksumService,
}

impl VersionedUploadEngine {
    /// An engine with explicit parsers and checksum service.
    pub fn new(parsers: ParserRegistry, checksums: ChecksumService) -> Self {
        Self { parsers, checksums }
    }

    /// The engine's parsers.
    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Upload `file` into `folder`.
    ///
    /// Never fails: errors are logged and reported as a failed status. The
    /// status detail holds one human-readable line for batch reports.
    pub fn upload_file<R: Repository>(
        &self,
        connection: &Connection<R>,
        folder: &Folder,
        file: &FileDescriptor,
        options: &UploadOptions,
    ) -> OperationStatus {
        let name = &file.display_name;
        match self.try_upload_file(connection, folder, file, options) {
            Ok(uploaded) => {
                let detail = match uploaded.outcome {
                    UploadOutcome::Created => format!("{name}: Success"),
                    UploadOutcome::Updated => {
                        format!("{name}: file exists in {}/ and its content has been updated.", folder.path)
                    }
                    UploadOutcome::Unchanged => format!(
                        "{name}: is identical to {}. No action performed.",
                        folder.child_path(name)
                    ),
                };
                OperationStatus::success(&uploaded.object_id).with_detail(detail)
            }
            Err(e) => {
                tracing::error!(
                    path = %folder.child_path(name),
                    user = %connection.user(),
                    error = %e,
                    "upload failed"
                );
                OperationStatus::failure(e.kind(), e.to_string())
                    .with_detail(format!("{name}: Failed with error: {e}."))
            }
        }
    }

    /// [`upload_file()`](Self::upload_file), returning the typed result.
    pub fn try_upload_file<R: Repository>(
        &self,
        connection: &Connection<R>,
        folder: &Folder,
        file: &FileDescriptor,
        options: &UploadOptions,
    ) -> Result<Uploaded, IngestError> {
        let repository = connection.repository();
        let path = folder.child_path(&file.display_name);
        let (content, checksum) = self.load(file)?;

        tracing::debug!(path = %path, "resolving upload target");
        let existing = match repository.get_object_by_path(&path) {
            Ok(object) => object.into_document()?,
            Err(RepositoryError::NotFound { .. }) => {
                return self.create(repository, folder, file, options, content, checksum, &path)
            }
            Err(e) => return Err(e.into()),
        };

        let working_copy = match &existing.checked_out_by {
            Some(owner) if !connection.session().may_override_lock(owner) => {
                return Err(IngestError::LockedByOther {
                    path,
                    owner: owner.clone(),
                });
            }
            Some(owner) => {
                tracing::debug!(path = %path, owner = %owner, "resuming held checkout");
                WorkingCopy::resume(&existing).ok_or_else(|| RepositoryError::ContentConflict {
                    target: path.clone(),
                    reason: "checked out without a working copy".into(),
                })?
            }
            None => WorkingCopy::check_out(repository, &existing)?,
        };

        self.update(repository, &existing, working_copy, file, options, content, checksum)
    }

    fn load(&self, file: &FileDescriptor) -> Result<(ContentStream, Checksum), IngestError> {
        let mut cursor = Cursor::new(file.read()?);
        let io_err = |e: std::io::Error| IngestError::io(PathBuf::from(&file.display_name), e);
        let checksum = self.checksums.digest_stream(&mut cursor).map_err(io_err)?;
        let content = ContentStream::from_reader(
            file.display_name.as_str(),
            file.metadata_type.mime_type(),
            &mut cursor,
        )
        .map_err(io_err)?;
        Ok((content, checksum))
    }

    fn parse(&self, file: &FileDescriptor, content: &[u8]) -> Result<PropertyMap, IngestError> {
        self.parsers
            .parse(file.metadata_type, content)
            .map_err(|source| IngestError::Parse {
                file: file.display_name.clone(),
                source,
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn create<R: Repository>(
        &self,
        repository: &R,
        folder: &Folder,
        file: &FileDescriptor,
        options: &UploadOptions,
        content: ContentStream,
        checksum: Checksum,
        path: &str,
    ) -> Result<Uploaded, IngestError> {
        let parsed = self.parse(file, content.data())?;
        let properties =
            document_properties(file, content.data(), &checksum, options, WritePath::Create, parsed);
        tracing::debug!(path = %path, "creating document");
        let document =
            repository.create_document(&folder.id, properties, content, VersioningState::Major)?;
        tracing::info!(object_id = %document.id, path = %path, "document created");
        Ok(Uploaded {
            outcome: UploadOutcome::Created,
            object_id: document.id,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn update<R: Repository>(
        &self,
        repository: &R,
        existing: &Document,
        working_copy: WorkingCopy,
        file: &FileDescriptor,
        options: &UploadOptions,
        content: ContentStream,
        checksum: Checksum,
    ) -> Result<Uploaded, IngestError> {
        if existing.checksum().is_some_and(|stored| checksum.matches_hex(stored)) {
            working_copy.cancel(repository)?;
            tracing::info!(object_id = %existing.id, path = %existing.path, "content unchanged");
            return Ok(Uploaded {
                outcome: UploadOutcome::Unchanged,
                object_id: existing.id.clone(),
            });
        }

        let parsed = match self.parse(file, content.data()) {
            Ok(parsed) => parsed,
            Err(e) => {
                release(repository, working_copy, &e);
                return Err(e);
            }
        };
        let properties =
            document_properties(file, content.data(), &checksum, options, WritePath::CheckIn, parsed);

        match working_copy.check_in(repository, options.major, properties, content, "") {
            Ok(id) => {
                tracing::info!(object_id = %id, path = %existing.path, major = options.major, "new version checked in");
                Ok(Uploaded {
                    outcome: UploadOutcome::Updated,
                    object_id: id,
                })
            }
            Err((working_copy, e)) => {
                let e = IngestError::from(e);
                release(repository, working_copy, &e);
                Err(e)
            }
        }
    }
}

/// Cancel a checkout after a failed update.
fn release<R: Repository>(repository: &R, working_copy: WorkingCopy, cause: &IngestError) {
    tracing::warn!(
        object_id = %working_copy.id(),
        path = %working_copy.path(),
        cause = %cause,
        "update failed, cancelling checkout"
    );
    let id = working_copy.id().clone();
    if let Err(e) = working_copy.cancel(repository) {
        tracing::warn!(object_id = %id, error = %e, "cancelling checkout failed; the lock remains");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmf_core::{ErrorKind, MetadataType, ParseError, Principal};
    use dmf_repository::{InMemoryRepository, Session};

    fn p(id: &str) -> Principal {
        Principal::new(id).unwrap()
    }

    fn connect(repo: &InMemoryRepository) -> Connection<InMemoryRepository> {
        Connection::new(repo.clone(), Session::new(repo.user().clone(), p("admin")))
    }

    fn setup() -> (Connection<InMemoryRepository>, Folder) {
        let repo = InMemoryRepository::new(p("alice")).unwrap();
        let folder = repo.seed_folder("/Shared/SorbentFit").unwrap();
        (connect(&repo), folder)
    }

    fn text_file(name: &str, data: &str) -> FileDescriptor {
        FileDescriptor::from_bytes(name, MetadataType::InputData, data.as_bytes().to_vec())
    }

    #[test]
    fn test_create_then_unchanged_then_updated() {
        let (conn, folder) = setup();
        let engine = VersionedUploadEngine::default();
        let options = UploadOptions::default();

        let created = engine.try_upload_file(&conn, &folder, &text_file("a.txt", "v1"), &options).unwrap();
        assert_eq!(created.outcome, UploadOutcome::Created);
        assert_eq!(created.object_id.version().unwrap().as_str(), "1.0");

        let same = engine.try_upload_file(&conn, &folder, &text_file("a.txt", "v1"), &options).unwrap();
        assert_eq!(same.outcome, UploadOutcome::Unchanged);
        assert_eq!(same.object_id, created.object_id);

        let changed = engine.try_upload_file(&conn, &folder, &text_file("a.txt", "v2"), &options).unwrap();
        assert_eq!(changed.outcome, UploadOutcome::Updated);
        assert_eq!(changed.object_id.version().unwrap().as_str(), "1.1");
        assert_eq!(changed.object_id.bare(), created.object_id.bare());
    }

    #[test]
    fn test_status_details() {
        let (conn, folder) = setup();
        let engine = VersionedUploadEngine::default();
        let options = UploadOptions::default();

        let status = engine.upload_file(&conn, &folder, &text_file("a.txt", "v1"), &options);
        assert_eq!(status.detail(), "a.txt: Success");
        assert_eq!(status.version().unwrap().as_str(), "1.0");
        assert!(!status.object_id().unwrap().as_str().contains(';'));

        let status = engine.upload_file(&conn, &folder, &text_file("a.txt", "v1"), &options);
        assert_eq!(
            status.detail(),
            "a.txt: is identical to /Shared/SorbentFit/a.txt. No action performed."
        );

        let status = engine.upload_file(&conn, &folder, &text_file("a.txt", "v2"), &options);
        assert_eq!(
            status.detail(),
            "a.txt: file exists in /Shared/SorbentFit/ and its content has been updated."
        );
    }

    #[test]
    fn test_create_parse_failure_creates_nothing() {
        let (conn, folder) = setup();
        let parsers = ParserRegistry::standard().with_parser(
            MetadataType::InputData,
            |_: &[u8]| -> Result<PropertyMap, ParseError> { Err(ParseError::NotText) },
        );
        let engine = VersionedUploadEngine::new(parsers, ChecksumService::default());
        let status = engine.upload_file(&conn, &folder, &text_file("a.txt", "v1"), &UploadOptions::default());
        assert_eq!(status.error_kind(), Some(ErrorKind::ParseFailure));
        assert!(status.detail().starts_with("a.txt: Failed with error: "));
        assert!(conn.repository().created_documents().is_empty());
    }

    #[test]
    fn test_update_parse_failure_cancels_checkout() {
        let (conn, folder) = setup();
        VersionedUploadEngine::default()
            .try_upload_file(&conn, &folder, &text_file("a.txt", "v1"), &UploadOptions::default())
            .unwrap();

        let parsers = ParserRegistry::standard().with_parser(
            MetadataType::InputData,
            |_: &[u8]| -> Result<PropertyMap, ParseError> { Err(ParseError::NotText) },
        );
        let engine = VersionedUploadEngine::new(parsers, ChecksumService::default());
        let err = engine
            .try_upload_file(&conn, &folder, &text_file("a.txt", "v2"), &UploadOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        let doc = conn
            .repository()
            .get_object_by_path("/Shared/SorbentFit/a.txt")
            .unwrap()
            .into_document()
            .unwrap();
        assert!(!doc.is_checked_out());
    }

    #[test]
    fn test_missing_local_file_is_io_failure() {
        let (conn, folder) = setup();
        let file = FileDescriptor::from_path("/nonexistent/dir/a.txt", MetadataType::InputData);
        let status = VersionedUploadEngine::default().upload_file(&conn, &folder, &file, &UploadOptions::default());
        assert_eq!(status.error_kind(), Some(ErrorKind::IoFailure));
    }
}
