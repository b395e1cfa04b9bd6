//! ACL reconciliation errors.

use dmf_core::{ErrorKind, ObjectId, RepositoryError};
use thiserror::Error;

use crate::saga::SagaPhase;

/// Failure inside an ACL reconciliation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AclError {
    /// A repository read or write failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A saga step was invoked out of order.
    #[error("ACL saga on {object_id} cannot {step} from phase {phase}")]
    InvalidPhase {
        /// The object the saga targets.
        object_id: ObjectId,
        /// The step that was attempted.
        step: &'static str,
        /// The phase the saga was in.
        phase: SagaPhase,
    },
}

impl AclError {
    /// Map onto the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository(e) => e.kind(),
            Self::InvalidPhase { .. } => ErrorKind::Unknown,
        }
    }
}
