//! # Access-Control Engine
//!
//! Reconciles one principal's entry on one object with a requested role.
//!
//! ## Grant
//!
//! 1. Read the ACL, inherited entries included.
//! 2. Find the principal's entry (exact match, first wins) and infer its
//!    current role from the marker token it carries.
//! 3. If the current role is the requested one, nothing is written. Any
//!    leftover boilerplate from an interrupted earlier run is still
//!    cleaned.
//! 4. Otherwise compute the new entry from the role transition matrix.
//!    - A principal with a prior entry: drop its direct entries and every
//!      inherited entry, append the new entry, replace the ACL.
//!    - A principal with no prior entry: add the new entry alone. The
//!      repository requires the additive form for first-time grants.
//! 5. Sanitize.
//!
//! ## Revoke
//!
//! Drop the principal's direct entries, replace the ACL with what
//! remains, and sanitize. Revoking a principal with no direct entry only
//! sanitizes.
//!
//! ## Boundary
//!
//! [`AccessControlEngine::add_permissions()`] and
//! [`AccessControlEngine::delete_permissions()`] log and swallow every
//! error, returning `false`. They never retry. Both are idempotent, so the
//! caller may simply call again. The `try_*` variants return the typed
//! outcome instead.

use dmf_core::{AccessControlEntry, ObjectId, Principal, Role};
use dmf_repository::Repository;
use serde::{Deserialize, Serialize};

use crate::error::AclError;
use crate::matrix::target_tokens;
use crate::policy::AclPolicy;
use crate::saga::{sanitize_acl, AclSaga, AclWrite};

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AclOutcome {
    /// The principal already held the requested role.
    Unchanged,
    /// A new entry was written for the principal.
    Granted {
        /// The role now recorded.
        role: Role,
        /// The role the replaced entry recorded, if any.
        previous: Option<Role>,
    },
    /// The principal's direct entries were removed.
    Revoked {
        /// The role the removed entry recorded, if any.
        previous: Option<Role>,
    },
    /// The principal had no direct entry to remove.
    NothingToRevoke,
}

/// Grants and revokes role-based access on repository objects.
#[derive(Debug, Clone, Default)]
pub struct AccessControlEngine {
    policy: AclPolicy,
}

impl AccessControlEngine {
    /// An engine with an explicit policy.
    pub fn new(policy: AclPolicy) -> Self {
        Self { policy }
    }

    /// The engine's policy.
    pub fn policy(&self) -> &AclPolicy {
        &self.policy
    }

    /// Give `principal` exactly `role` on `object_id`.
    ///
    /// Returns `true` on success, including when the role was already in
    /// place. Any failure is logged and yields `false`.
    pub fn add_permissions<R: Repository + ?Sized>(
        &self,
        repository: &R,
        principal: &Principal,
        object_id: &ObjectId,
        role: Role,
    ) -> bool {
        match self.try_add_permissions(repository, principal, object_id, role) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    principal = %principal,
                    object_id = %object_id,
                    role = %role,
                    error = %e,
                    "granting role failed"
                );
                false
            }
        }
    }

    /// Remove `principal`'s direct entry from `object_id`.
    ///
    /// Returns `true` on success, including when there was nothing to
    /// remove. Any failure is logged and yields `false`.
    pub fn delete_permissions<R: Repository + ?Sized>(
        &self,
        repository: &R,
        principal: &Principal,
        object_id: &ObjectId,
    ) -> bool {
        match self.try_delete_permissions(repository, principal, object_id) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    principal = %principal,
                    object_id = %object_id,
                    error = %e,
                    "revoking permissions failed"
                );
                false
            }
        }
    }

    /// Clean boilerplate and inherited entries off `object_id`'s ACL.
    pub fn sanitize<R: Repository + ?Sized>(&self, repository: &R, object_id: &ObjectId) -> bool {
        match sanitize_acl(repository, object_id, &self.policy) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(object_id = %object_id, error = %e, "sanitizing ACL failed");
                false
            }
        }
    }

    /// [`add_permissions()`](Self::add_permissions), returning the outcome.
    pub fn try_add_permissions<R: Repository + ?Sized>(
        &self,
        repository: &R,
        principal: &Principal,
        object_id: &ObjectId,
        role: Role,
    ) -> Result<AclOutcome, AclError> {
        let acl = repository.get_acl(object_id, true)?;
        let existing = acl.find(principal);
        let current = existing.and_then(AccessControlEntry::role);

        let Some(tokens) = target_tokens(role, current) else {
            sanitize_acl(repository, object_id, &self.policy)?;
            tracing::info!(principal = %principal, object_id = %object_id, role = %role, "role already granted");
            return Ok(AclOutcome::Unchanged);
        };

        let entry = AccessControlEntry::direct(principal.clone(), tokens);
        let write = if existing.is_some() {
            let mut entries: Vec<AccessControlEntry> = acl
                .direct_entries()
                .filter(|e| &e.principal != principal)
                .cloned()
                .collect();
            entries.push(entry);
            AclWrite::Replace(entries)
        } else {
            AclWrite::Add(entry)
        };

        AclSaga::new(object_id.clone(), write).run(repository, &self.policy)?;
        tracing::info!(
            principal = %principal,
            object_id = %object_id,
            role = %role,
            previous = ?current,
            "role granted"
        );
        Ok(AclOutcome::Granted {
            role,
            previous: current,
        })
    }

    /// [`delete_permissions()`](Self::delete_permissions), returning the outcome.
    pub fn try_delete_permissions<R: Repository + ?Sized>(
        &self,
        repository: &R,
        principal: &Principal,
        object_id: &ObjectId,
    ) -> Result<AclOutcome, AclError> {
        let acl = repository.get_acl(object_id, true)?;
        let Some(previous) = acl.find_direct(principal) else {
            sanitize_acl(repository, object_id, &self.policy)?;
            tracing::info!(principal = %principal, object_id = %object_id, "no direct entry to revoke");
            return Ok(AclOutcome::NothingToRevoke);
        };
        let previous = previous.role();

        let remaining: Vec<AccessControlEntry> = acl
            .direct_entries()
            .filter(|e| &e.principal != principal)
            .cloned()
            .collect();
        AclSaga::new(object_id.clone(), AclWrite::Replace(remaining)).run(repository, &self.policy)?;
        tracing::info!(principal = %principal, object_id = %object_id, previous = ?previous, "permissions revoked");
        Ok(AclOutcome::Revoked { previous })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmf_repository::InMemoryRepository;

    fn p(id: &str) -> Principal {
        Principal::new(id).unwrap()
    }

    fn setup() -> (InMemoryRepository, ObjectId) {
        let repo = InMemoryRepository::new(p("admin")).unwrap();
        let folder = repo.seed_folder("/Shared/SorbentFit").unwrap();
        (repo, folder.id)
    }

    #[test]
    fn test_first_grant_uses_additive_write() {
        let (repo, id) = setup();
        let engine = AccessControlEngine::default();
        let outcome = engine
            .try_add_permissions(&repo, &p("bob"), &id, Role::Editor)
            .unwrap();
        assert_eq!(
            outcome,
            AclOutcome::Granted {
                role: Role::Editor,
                previous: None
            }
        );
        assert!(matches!(
            repo.calls().first(),
            Some(dmf_repository::RepositoryCall::AddAcl(_))
        ));
    }

    #[test]
    fn test_regrant_uses_replace_write() {
        let (repo, id) = setup();
        let engine = AccessControlEngine::default();
        engine.try_add_permissions(&repo, &p("bob"), &id, Role::Editor).unwrap();
        repo.clear_calls();
        engine.try_add_permissions(&repo, &p("bob"), &id, Role::Consumer).unwrap();
        assert!(matches!(
            repo.calls().first(),
            Some(dmf_repository::RepositoryCall::SetAcl(_))
        ));
    }

    #[test]
    fn test_delete_without_entry_is_nothing_to_revoke() {
        let (repo, id) = setup();
        let outcome = AccessControlEngine::default()
            .try_delete_permissions(&repo, &p("bob"), &id)
            .unwrap();
        assert_eq!(outcome, AclOutcome::NothingToRevoke);
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let (repo, _) = setup();
        let missing = ObjectId::new("no-such-object").unwrap();
        let err = AccessControlEngine::default()
            .try_add_permissions(&repo, &p("bob"), &missing, Role::Editor)
            .unwrap_err();
        assert_eq!(err.kind(), dmf_core::ErrorKind::NotFound);
        assert!(!AccessControlEngine::default().add_permissions(&repo, &p("bob"), &missing, Role::Editor));
    }
}
