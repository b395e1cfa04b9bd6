//! # Operation Status
//!
//! The terminal result of every upload and ingestion operation. A status
//! is built once, through [`OperationStatus::success()`] or
//! [`OperationStatus::failure()`], and never mutated afterwards. The only
//! later addition is the human-readable detail log, attached by consuming
//! the value.
//!
//! ## Canonical Identity
//!
//! A successful status always reports the bare object id. The version
//! label the repository appended to the id is exposed separately through
//! [`OperationStatus::version()`].

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::identity::{ObjectId, VersionTag};

/// Short status message of every successful operation.
pub const SUCCESS_MESSAGE: &str = "Success";

/// Outcome of one engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    success: bool,
    object_id: Option<ObjectId>,
    version: Option<VersionTag>,
    error_kind: Option<ErrorKind>,
    message: String,
    detail: String,
}

impl OperationStatus {
    /// A successful status for the object the repository returned.
    ///
    /// Any version suffix on `id` is split off into [`version()`](Self::version).
    pub fn success(id: &ObjectId) -> Self {
        let (bare, version) = id.split_version();
        Self {
            success: true,
            object_id: Some(bare),
            version,
            error_kind: None,
            message: SUCCESS_MESSAGE.to_string(),
            detail: String::new(),
        }
    }

    /// A failed status with its taxonomy kind and cause.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            object_id: None,
            version: None,
            error_kind: Some(kind),
            message: message.into(),
            detail: String::new(),
        }
    }

    /// Attach the detail log.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Whether the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The bare object id of a successful operation.
    pub fn object_id(&self) -> Option<&ObjectId> {
        self.object_id.as_ref()
    }

    /// The version label split off the repository-returned id.
    pub fn version(&self) -> Option<&VersionTag> {
        self.version.as_ref()
    }

    /// Failure classification; `None` on success.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Short message: `Success` or the failure cause.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Longer human-readable log for batch reporting.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.object_id, &self.error_kind) {
            (Some(id), _) => write!(f, "{} ({id})", self.message),
            (None, Some(kind)) => write!(f, "{kind}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_splits_version() {
        let status = OperationStatus::success(&ObjectId::new("doc-7;2.1").unwrap());
        assert!(status.is_success());
        assert_eq!(status.object_id().unwrap().as_str(), "doc-7");
        assert_eq!(status.version().unwrap().as_str(), "2.1");
        assert_eq!(status.message(), "Success");
        assert!(status.error_kind().is_none());
    }

    #[test]
    fn test_success_without_version() {
        let status = OperationStatus::success(&ObjectId::new("folder-3").unwrap());
        assert_eq!(status.object_id().unwrap().as_str(), "folder-3");
        assert!(status.version().is_none());
    }

    #[test]
    fn test_failure_has_no_identity() {
        let status = OperationStatus::failure(ErrorKind::NotFound, "object not found: /x");
        assert!(!status.is_success());
        assert!(status.object_id().is_none());
        assert!(status.version().is_none());
        assert_eq!(status.error_kind(), Some(ErrorKind::NotFound));
        assert_eq!(status.to_string(), "NotFound: object not found: /x");
    }

    #[test]
    fn test_with_detail_keeps_outcome() {
        let status = OperationStatus::success(&ObjectId::new("a;1.0").unwrap())
            .with_detail("a.txt: Success");
        assert!(status.is_success());
        assert_eq!(status.detail(), "a.txt: Success");
    }

    #[test]
    fn test_serializes_for_batch_reports() {
        let status = OperationStatus::failure(ErrorKind::ParseFailure, "line 3: bad row");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error_kind"], "ParseFailure");
    }
}
