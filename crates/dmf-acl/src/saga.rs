//! # ACL Write Saga
//!
//! Every engine-issued ACL change runs as two repository writes:
//!
//! ```text
//! Planned ──apply()──▶ Applied ──sanitize()──▶ Sanitized ──sanitize()──▶ Sanitized
//!    │                    │
//!    └──── error ─────────┴──────▶ Failed
//! ```
//!
//! 1. **apply** submits the planned change: a full replacement of the
//!    direct entries, or an additive write of one new entry.
//! 2. **sanitize** re-reads the ACL and writes back its cleaned form (see
//!    [`AclPolicy::clean()`]). The repository re-injects boilerplate tokens
//!    into entries an ACL write changes, and this step removes them.
//!
//! ## Failure Semantics
//!
//! The two writes are not atomic. A failure between them leaves
//! boilerplate on the object. Sanitizing is idempotent and writes only
//! when there is something to clean, so any later reconciliation on the
//! same object heals it.

use dmf_core::{AccessControlEntry, ObjectId};
use dmf_repository::Repository;

use crate::error::AclError;
use crate::policy::AclPolicy;

/// The phase of an ACL saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaPhase {
    /// The write is planned but not yet submitted.
    Planned,
    /// The write was accepted by the repository.
    Applied,
    /// The ACL has been cleaned after the write (terminal).
    Sanitized,
    /// A repository call failed (terminal).
    Failed,
}

impl SagaPhase {
    /// Whether this phase is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sanitized | Self::Failed)
    }
}

impl std::fmt::Display for SagaPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Planned => "PLANNED",
            Self::Applied => "APPLIED",
            Self::Sanitized => "SANITIZED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// The change submitted by [`AclSaga::apply()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclWrite {
    /// Replace the object's direct entries.
    Replace(Vec<AccessControlEntry>),
    /// Add one entry for a principal with no prior entry.
    Add(AccessControlEntry),
}

/// Two-step ACL change on one object.
#[derive(Debug)]
pub struct AclSaga {
    object_id: ObjectId,
    write: AclWrite,
    phase: SagaPhase,
}

impl AclSaga {
    /// Plan `write` against `object_id`.
    pub fn new(object_id: ObjectId, write: AclWrite) -> Self {
        Self {
            object_id,
            write,
            phase: SagaPhase::Planned,
        }
    }

    /// The object the saga targets.
    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    /// The planned write.
    pub fn write(&self) -> &AclWrite {
        &self.write
    }

    /// The current phase.
    pub fn phase(&self) -> SagaPhase {
        self.phase
    }

    /// Submit the planned write. Valid only from `Planned`.
    pub fn apply<R: Repository + ?Sized>(
        &mut self,
        repository: &R,
        policy: &AclPolicy,
    ) -> Result<(), AclError> {
        self.require(SagaPhase::Planned, "apply")?;
        let result = match &self.write {
            AclWrite::Replace(entries) => {
                tracing::debug!(object_id = %self.object_id, entries = entries.len(), "replacing ACL");
                repository.set_acl(&self.object_id, entries)
            }
            AclWrite::Add(entry) => {
                tracing::debug!(object_id = %self.object_id, principal = %entry.principal, "adding ACL entry");
                repository.add_acl(&self.object_id, std::slice::from_ref(entry), policy.propagation)
            }
        };
        self.advance(result.map_err(AclError::from), SagaPhase::Applied)
    }

    /// Clean the ACL after the write. Valid from `Applied` and repeatable
    /// from `Sanitized`.
    ///
    /// Returns whether a cleaning write was needed.
    pub fn sanitize<R: Repository + ?Sized>(
        &mut self,
        repository: &R,
        policy: &AclPolicy,
    ) -> Result<bool, AclError> {
        if self.phase != SagaPhase::Sanitized {
            self.require(SagaPhase::Applied, "sanitize")?;
        }
        let result = sanitize_acl(repository, &self.object_id, policy);
        let wrote = result.as_ref().copied().unwrap_or(false);
        self.advance(result.map(|_| ()), SagaPhase::Sanitized)?;
        Ok(wrote)
    }

    /// Run both steps to completion.
    pub fn run<R: Repository + ?Sized>(
        mut self,
        repository: &R,
        policy: &AclPolicy,
    ) -> Result<SagaPhase, AclError> {
        self.apply(repository, policy)?;
        if let Err(e) = self.sanitize(repository, policy) {
            tracing::warn!(
                object_id = %self.object_id,
                error = %e,
                "ACL write applied but sanitize failed; boilerplate may remain until the next reconciliation"
            );
            return Err(e);
        }
        Ok(self.phase)
    }

    fn require(&self, expected: SagaPhase, step: &'static str) -> Result<(), AclError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(AclError::InvalidPhase {
                object_id: self.object_id.clone(),
                step,
                phase: self.phase,
            })
        }
    }

    fn advance(&mut self, result: Result<(), AclError>, next: SagaPhase) -> Result<(), AclError> {
        match result {
            Ok(()) => {
                self.phase = next;
                Ok(())
            }
            Err(e) => {
                self.phase = SagaPhase::Failed;
                Err(e)
            }
        }
    }
}

/// Re-read the object's ACL and write back its cleaned form.
///
/// Returns `Ok(false)` without writing when the direct entries are
/// already clean.
pub fn sanitize_acl<R: Repository + ?Sized>(
    repository: &R,
    object_id: &ObjectId,
    policy: &AclPolicy,
) -> Result<bool, AclError> {
    let acl = repository.get_acl(object_id, true)?;
    let direct: Vec<AccessControlEntry> = acl.direct_entries().cloned().collect();
    let cleaned = policy.clean(&direct);
    if cleaned == direct {
        tracing::debug!(object_id = %object_id, "ACL already clean");
        return Ok(false);
    }
    tracing::debug!(
        object_id = %object_id,
        before = direct.len(),
        after = cleaned.len(),
        "writing sanitized ACL"
    );
    repository.set_acl(object_id, &cleaned)?;
    Ok(true)
}
