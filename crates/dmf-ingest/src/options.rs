//! Per-call knobs for uploads and batch ingestion.

use serde::{Deserialize, Serialize};

/// Confidence degree recorded when the caller gives none.
pub const DEFAULT_CONFIDENCE: &str = "experimental";

/// Repository folder batches are ingested into by default.
pub const DEFAULT_TARGET_FOLDER: &str = "/Shared/SorbentFit";

/// Options for a single file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Recorded as `ccsi:confidenceDegree`.
    pub confidence: String,
    /// Check in updates as major versions. New documents are always `1.0`.
    pub major: bool,
    /// Recorded as `ccsi:link` when present.
    pub external_link: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE.to_string(),
            major: false,
            external_link: None,
        }
    }
}

/// Options for a batch ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Applied to every file of the batch.
    pub upload: UploadOptions,
    /// Absolute repository path of the target folder.
    pub target_folder: String,
    /// Create the target folder, and any missing ancestors, when absent.
    pub create_missing_folder: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            upload: UploadOptions::default(),
            target_folder: DEFAULT_TARGET_FOLDER.to_string(),
            create_missing_folder: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = IngestOptions::default();
        assert_eq!(options.target_folder, "/Shared/SorbentFit");
        assert!(options.create_missing_folder);
        assert_eq!(options.upload.confidence, "experimental");
        assert!(!options.upload.major);
        assert!(options.upload.external_link.is_none());
    }
}
