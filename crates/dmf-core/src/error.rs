//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types shared across the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every error maps onto exactly one [`ErrorKind`], the closed taxonomy
//!   reported to callers in a failed `OperationStatus`.
//! - Repository errors name the object or path the call targeted.
//! - Parse errors carry the 1-based line that failed, when one exists.

use thiserror::Error;

/// The closed failure taxonomy reported at every engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The target object or path does not exist.
    NotFound,
    /// The caller is not allowed to perform the operation, including
    /// writes against a document checked out by someone else.
    PermissionDenied,
    /// The repository rejected a write as conflicting with current state.
    ContentConflict,
    /// Metadata extraction from file content failed.
    ParseFailure,
    /// A local file or stream operation failed.
    IoFailure,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Returns the taxonomy name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::ContentConflict => "ContentConflict",
            Self::ParseFailure => "ParseFailure",
            Self::IoFailure => "IOFailure",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failures surfaced by a repository protocol client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No object exists at the requested id or path.
    #[error("object not found: {target}")]
    NotFound {
        /// The id or path that failed to resolve.
        target: String,
    },

    /// The session principal may not perform this call.
    #[error("permission denied on {target}: {reason}")]
    PermissionDenied {
        /// The id or path the call targeted.
        target: String,
        /// Repository-supplied reason.
        reason: String,
    },

    /// The write conflicts with repository state (name clash, stale
    /// working copy, version series already checked out).
    #[error("content conflict on {target}: {reason}")]
    ContentConflict {
        /// The id or path the call targeted.
        target: String,
        /// Repository-supplied reason.
        reason: String,
    },

    /// Any other repository or transport failure.
    #[error("repository error: {0}")]
    Other(String),
}

impl RepositoryError {
    /// Shorthand for a [`RepositoryError::NotFound`].
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    /// Map onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::ContentConflict { .. } => ErrorKind::ContentConflict,
            Self::Other(_) => ErrorKind::Unknown,
        }
    }
}

/// Failure while extracting document properties from file content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line did not have the expected shape.
    #[error("line {line}: {reason}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A value that should be numeric was not.
    #[error("line {line}: invalid number {value:?}")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        value: String,
    },

    /// Content ended before a required line.
    #[error("missing {what}")]
    Missing {
        /// Description of the missing element.
        what: String,
    },

    /// Content is not valid UTF-8 text.
    #[error("content is not valid UTF-8 text")]
    NotText,
}

impl ParseError {
    /// Parse errors always map to [`ErrorKind::ParseFailure`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ParseFailure
    }
}

/// Rejected identifier construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Identifier was empty or whitespace only.
    #[error("{kind} must not be empty")]
    Empty {
        /// Which identifier type was being built.
        kind: &'static str,
    },

    /// Identifier contained characters the repository rejects.
    #[error("{kind} {value:?} contains invalid characters")]
    InvalidCharacters {
        /// Which identifier type was being built.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}
