//! # Repository Protocol Client Contract
//!
//! The [`Repository`] trait is the only way the engines reach the remote
//! document repository. It mirrors the protocol's object services
//! (lookup, create, checkout/checkin) and ACL services (read, replace,
//! add) and nothing else.
//!
//! ## Architecture
//!
//! Production deployments implement the trait against the repository's
//! wire protocol; tests use [`InMemoryRepository`](crate::memory::InMemoryRepository).
//! Implementations act as one authenticated principal. Checkout ownership
//! and lock checks are made against that principal.
//!
//! Errors surface as [`RepositoryError`], whose typed variants (not found,
//! permission denied, content conflict) the engines translate into failed
//! operation statuses.

use std::io::{self, Read};

use serde::{Deserialize, Serialize};

use dmf_core::{
    metadata::props, AccessControlEntry, AccessControlList, ObjectId, Principal, PropertyMap,
    RepositoryError, VersionTag,
};

/// Version classification applied to a newly created document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersioningState {
    /// First version is `1.0`.
    Major,
    /// First version is `0.1`.
    Minor,
}

impl VersioningState {
    /// `Major` when `major` is set.
    pub fn from_major(major: bool) -> Self {
        if major {
            Self::Major
        } else {
            Self::Minor
        }
    }

    /// Whether this is a major version.
    pub fn is_major(&self) -> bool {
        matches!(self, Self::Major)
    }
}

/// How an additive ACL write propagates to descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AclPropagation {
    /// Let the repository decide.
    #[default]
    RepositoryDetermined,
    /// Apply to the object only.
    ObjectOnly,
    /// Apply to the object and its descendants.
    Propagate,
}

/// Content sent with a create or check-in.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentStream {
    file_name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl ContentStream {
    /// Wrap an in-memory buffer.
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read `reader` from its current position to the end.
    pub fn from_reader<R: Read>(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        reader: &mut R,
    ) -> io::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::new(file_name, mime_type, data))
    }

    /// File name sent with the stream.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Content MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Content bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume into the content bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A document version as returned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Versioned object id (`<series>;<label>`).
    pub id: ObjectId,
    /// Name within the parent folder.
    pub name: String,
    /// Absolute repository path.
    pub path: String,
    /// Properties of this version.
    pub properties: PropertyMap,
    /// Version label of this version.
    pub version_label: VersionTag,
    /// Principal holding the version series checkout, if any.
    pub checked_out_by: Option<Principal>,
    /// Id of the private working copy, while checked out.
    pub working_copy_id: Option<ObjectId>,
}

impl Document {
    /// Whether the version series is checked out.
    pub fn is_checked_out(&self) -> bool {
        self.checked_out_by.is_some()
    }

    /// A single-valued text property.
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(|v| v.as_str())
    }

    /// The stored content checksum, if the document has one.
    pub fn checksum(&self) -> Option<&str> {
        self.property_str(props::CHECKSUM)
    }
}

/// A folder as returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Folder object id.
    pub id: ObjectId,
    /// Name within the parent folder.
    pub name: String,
    /// Absolute repository path.
    pub path: String,
}

impl Folder {
    /// Absolute path of a child named `name`.
    pub fn child_path(&self, name: &str) -> String {
        join_path(&self.path, name)
    }
}

/// Join a parent path and a child name with exactly one `/`.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Any object the repository can return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RepositoryObject {
    /// A document version.
    Document(Document),
    /// A folder.
    Folder(Folder),
}

impl RepositoryObject {
    /// The object id.
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::Document(d) => &d.id,
            Self::Folder(f) => &f.id,
        }
    }

    /// The absolute repository path.
    pub fn path(&self) -> &str {
        match self {
            Self::Document(d) => &d.path,
            Self::Folder(f) => &f.path,
        }
    }

    /// Narrow to a document; a folder is a content conflict.
    pub fn into_document(self) -> Result<Document, RepositoryError> {
        match self {
            Self::Document(d) => Ok(d),
            Self::Folder(f) => Err(RepositoryError::ContentConflict {
                target: f.path,
                reason: "expected a document, found a folder".into(),
            }),
        }
    }

    /// Narrow to a folder; a document is a content conflict.
    pub fn into_folder(self) -> Result<Folder, RepositoryError> {
        match self {
            Self::Folder(f) => Ok(f),
            Self::Document(d) => Err(RepositoryError::ContentConflict {
                target: d.path,
                reason: "expected a folder, found a document".into(),
            }),
        }
    }
}

/// Repository protocol client.
///
/// Implementations must be `Send + Sync` so a connection can be shared
/// across threads. The trait is object-safe to support runtime selection
/// of the backing implementation.
pub trait Repository: Send + Sync {
    /// Resolve an object by id. A bare document id resolves to the latest
    /// version.
    fn get_object(&self, id: &ObjectId) -> Result<RepositoryObject, RepositoryError>;

    /// Resolve an object by absolute path.
    fn get_object_by_path(&self, path: &str) -> Result<RepositoryObject, RepositoryError>;

    /// Read an object's ACL, optionally including inherited entries.
    fn get_acl(
        &self,
        id: &ObjectId,
        include_inherited: bool,
    ) -> Result<AccessControlList, RepositoryError>;

    /// Replace the object's direct entries with `entries`.
    fn set_acl(&self, id: &ObjectId, entries: &[AccessControlEntry]) -> Result<(), RepositoryError>;

    /// Merge `entries` into the object's direct entries.
    fn add_acl(
        &self,
        id: &ObjectId,
        entries: &[AccessControlEntry],
        propagation: AclPropagation,
    ) -> Result<(), RepositoryError>;

    /// Create a document in `folder`. The name comes from `cmis:name`.
    fn create_document(
        &self,
        folder: &ObjectId,
        properties: PropertyMap,
        content: ContentStream,
        versioning: VersioningState,
    ) -> Result<Document, RepositoryError>;

    /// Check out a document, returning the private working copy id.
    fn check_out(&self, document: &ObjectId) -> Result<ObjectId, RepositoryError>;

    /// Check in a working copy as a new version, returning the new
    /// version's id.
    fn check_in(
        &self,
        working_copy: &ObjectId,
        major: bool,
        properties: PropertyMap,
        content: ContentStream,
        comment: &str,
    ) -> Result<ObjectId, RepositoryError>;

    /// Discard a working copy and release the checkout.
    fn cancel_check_out(&self, working_copy: &ObjectId) -> Result<(), RepositoryError>;

    /// Create a folder in `parent`. The name comes from `cmis:name`.
    fn create_folder(
        &self,
        parent: &ObjectId,
        properties: PropertyMap,
    ) -> Result<Folder, RepositoryError>;

    /// Version labels of a document's series, newest first.
    fn get_all_versions(&self, document: &ObjectId) -> Result<Vec<VersionTag>, RepositoryError>;

    /// Human-readable name of this implementation.
    fn repository_name(&self) -> &str;
}

/// Whether an object exists at `path`.
///
/// Only a not-found error means "absent". Any other failure propagates so
/// that a transport error is never mistaken for a missing document.
pub fn object_exists<R: Repository + ?Sized>(
    repository: &R,
    path: &str,
) -> Result<bool, RepositoryError> {
    match repository.get_object_by_path(path) {
        Ok(_) => Ok(true),
        Err(RepositoryError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
