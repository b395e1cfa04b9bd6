//! # Repository Identity Newtypes
//!
//! Newtype wrappers for the identifiers the repository hands back and the
//! principals it authorizes. These prevent accidental identifier
//! confusion: you cannot pass a `Principal` where an `ObjectId` is
//! expected.
//!
//! ## Version Suffixes
//!
//! Repository object ids for documents carry a version label after a `;`
//! separator (`3f1c...;1.2`). [`ObjectId::split_version()`] splits on the
//! last separator. The part before it is the bare id that names the whole
//! version series.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdentityError;

/// Separator between a version series id and its version label.
pub const VERSION_SEPARATOR: char = ';';

/// Version label of a private working copy.
pub const WORKING_COPY_LABEL: &str = "pwc";

fn validate(kind: &'static str, raw: String) -> Result<String, IdentityError> {
    if raw.trim().is_empty() {
        return Err(IdentityError::Empty { kind });
    }
    if raw.chars().any(char::is_control) {
        return Err(IdentityError::InvalidCharacters { kind, value: raw });
    }
    Ok(raw)
}

/// A user or group identifier known to the repository.
///
/// Principals compare by exact string equality. `alice` and `alice2` are
/// different principals and never match each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Create a principal, rejecting empty or control-character ids.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        validate("principal", id.into()).map(Self)
    }

    /// The raw principal id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A repository object identifier, with or without a version suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Create an object id, rejecting empty or control-character ids.
    pub fn new(id: impl Into<String>) -> Result<Self, IdentityError> {
        validate("object id", id.into()).map(Self)
    }

    /// Generate a fresh random object id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Join a series id and a version label into a versioned id.
    pub fn versioned(series: &ObjectId, label: &VersionTag) -> Self {
        Self(format!("{}{VERSION_SEPARATOR}{}", series.0, label.0))
    }

    /// The raw id, including any version suffix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into the bare series id and the version label, if present.
    ///
    /// An id ending in a bare separator (`abc;`) has no version label.
    pub fn split_version(&self) -> (ObjectId, Option<VersionTag>) {
        match self.0.rsplit_once(VERSION_SEPARATOR) {
            Some((bare, label)) if !bare.is_empty() => {
                let tag = (!label.is_empty()).then(|| VersionTag(label.to_string()));
                (ObjectId(bare.to_string()), tag)
            }
            _ => (self.clone(), None),
        }
    }

    /// The bare series id.
    pub fn bare(&self) -> ObjectId {
        self.split_version().0
    }

    /// The version label, if this id carries one.
    pub fn version(&self) -> Option<VersionTag> {
        self.split_version().1
    }

    /// Whether this id names a private working copy.
    pub fn is_working_copy(&self) -> bool {
        self.version().is_some_and(|v| v.is_working_copy())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document version label such as `1.0`, `0.3`, or `pwc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    /// Create a version tag from a raw label.
    pub fn new(label: impl Into<String>) -> Result<Self, IdentityError> {
        validate("version tag", label.into()).map(Self)
    }

    /// The label a freshly created document receives.
    pub fn initial(major: bool) -> Self {
        if major {
            Self("1.0".to_string())
        } else {
            Self("0.1".to_string())
        }
    }

    /// The private working copy label.
    pub fn working_copy() -> Self {
        Self(WORKING_COPY_LABEL.to_string())
    }

    /// The raw label.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the private working copy label.
    pub fn is_working_copy(&self) -> bool {
        self.0 == WORKING_COPY_LABEL
    }

    /// Parse as `major.minor`.
    pub fn numbers(&self) -> Option<(u32, u32)> {
        let (major, minor) = self.0.split_once('.')?;
        Some((major.parse().ok()?, minor.parse().ok()?))
    }

    /// The label that follows this one after a check-in.
    ///
    /// A major check-in bumps the major number and resets the minor one.
    /// A minor check-in bumps the minor number. Returns `None` for labels
    /// that are not `major.minor`.
    pub fn next(&self, major: bool) -> Option<Self> {
        let (maj, min) = self.numbers()?;
        let label = if major {
            format!("{}.0", maj + 1)
        } else {
            format!("{maj}.{}", min + 1)
        };
        Some(Self(label))
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
