//! # Private Working Copy
//!
//! A checked-out document is held as a [`WorkingCopy`] value that must be
//! consumed exactly once, by [`check_in()`](WorkingCopy::check_in) or by
//! [`cancel()`](WorkingCopy::cancel). A failed check-in hands the working
//! copy back so the caller can still cancel it. Dropping one unconsumed
//! leaves the repository lock in place.

use dmf_core::{ObjectId, PropertyMap, RepositoryError};
use dmf_repository::{ContentStream, Document, Repository};

/// A held checkout on one document series.
#[derive(Debug)]
#[must_use = "a working copy must be checked in or cancelled"]
pub struct WorkingCopy {
    id: ObjectId,
    path: String,
}

impl WorkingCopy {
    /// Check out `document`.
    pub fn check_out<R: Repository + ?Sized>(
        repository: &R,
        document: &Document,
    ) -> Result<Self, RepositoryError> {
        tracing::debug!(object_id = %document.id, path = %document.path, "checking out");
        let id = repository.check_out(&document.id)?;
        Ok(Self {
            id,
            path: document.path.clone(),
        })
    }

    /// Take over the checkout already held on `document`.
    ///
    /// Returns `None` when the document is not checked out.
    pub fn resume(document: &Document) -> Option<Self> {
        document.working_copy_id.as_ref().map(|id| Self {
            id: id.clone(),
            path: document.path.clone(),
        })
    }

    /// The working copy's object id.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Repository path of the checked-out document.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check in as a new version, returning its id.
    ///
    /// On failure the working copy comes back with the error.
    pub fn check_in<R: Repository + ?Sized>(
        self,
        repository: &R,
        major: bool,
        properties: PropertyMap,
        content: ContentStream,
        comment: &str,
    ) -> Result<ObjectId, (Self, RepositoryError)> {
        tracing::debug!(object_id = %self.id, major, "checking in");
        match repository.check_in(&self.id, major, properties, content, comment) {
            Ok(id) => Ok(id),
            Err(e) => Err((self, e)),
        }
    }

    /// Release the checkout without writing a version.
    pub fn cancel<R: Repository + ?Sized>(self, repository: &R) -> Result<(), RepositoryError> {
        tracing::debug!(object_id = %self.id, "cancelling checkout");
        repository.cancel_check_out(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmf_core::metadata::props;
    use dmf_core::Principal;
    use dmf_repository::{InMemoryRepository, VersioningState};

    fn setup() -> (InMemoryRepository, Document) {
        let repo = InMemoryRepository::new(Principal::new("alice").unwrap()).unwrap();
        let folder = repo.seed_folder("/Shared").unwrap();
        let mut properties = PropertyMap::new();
        properties.insert(props::NAME.into(), "a.txt".into());
        let doc = repo
            .create_document(
                &folder.id,
                properties,
                ContentStream::new("a.txt", "text/plain", b"v1".to_vec()),
                VersioningState::Major,
            )
            .unwrap();
        (repo, doc)
    }

    fn reload(repo: &InMemoryRepository, doc: &Document) -> Document {
        repo.get_object_by_path(&doc.path).unwrap().into_document().unwrap()
    }

    #[test]
    fn test_check_in_releases_lock() {
        let (repo, doc) = setup();
        let wc = WorkingCopy::check_out(&repo, &doc).unwrap();
        assert!(wc.id().is_working_copy());
        assert!(reload(&repo, &doc).is_checked_out());

        let id = wc
            .check_in(
                &repo,
                false,
                PropertyMap::new(),
                ContentStream::new("a.txt", "text/plain", b"v2".to_vec()),
                "",
            )
            .unwrap();
        assert_eq!(id.version().unwrap().as_str(), "1.1");
        assert!(!reload(&repo, &doc).is_checked_out());
    }

    #[test]
    fn test_failed_check_in_returns_working_copy() {
        let (repo, doc) = setup();
        repo.fail_next_check_ins(1);
        let wc = WorkingCopy::check_out(&repo, &doc).unwrap();
        let (wc, _err) = wc
            .check_in(
                &repo,
                true,
                PropertyMap::new(),
                ContentStream::new("a.txt", "text/plain", b"v2".to_vec()),
                "",
            )
            .unwrap_err();
        assert!(reload(&repo, &doc).is_checked_out());
        wc.cancel(&repo).unwrap();
        assert!(!reload(&repo, &doc).is_checked_out());
    }

    #[test]
    fn test_resume_existing_checkout() {
        let (repo, doc) = setup();
        assert!(WorkingCopy::resume(&doc).is_none());
        let held = WorkingCopy::check_out(&repo, &doc).unwrap();
        let resumed = WorkingCopy::resume(&reload(&repo, &doc)).unwrap();
        assert_eq!(resumed.id(), held.id());
        resumed.cancel(&repo).unwrap();
        drop(held);
    }
}
