//! # dmf-acl — Access-Control Reconciliation
//!
//! Converts a requested coarse-grained [`Role`](dmf_core::Role) into the
//! repository's access-control entries, idempotently, and compensates for
//! the boilerplate tokens the repository injects on ACL writes.
//!
//! - [`matrix`]: the role transition matrix.
//! - [`saga`]: the two-step `apply` then `sanitize` write.
//! - [`policy`]: boilerplate token list and propagation mode.
//! - [`engine`]: [`AccessControlEngine`], grant and revoke.
//!
//! ## Invariants
//!
//! After any engine-issued write sequence completes, the object's direct
//! entries hold at most one entry per principal the engine touched, no
//! inherited entries were submitted, and no boilerplate token remains.
//!
//! Concurrent reconciliations on the same object are not serialized here.
//! The last writer wins. Callers needing strict ordering must lock per
//! object id.

pub mod engine;
pub mod error;
pub mod matrix;
pub mod policy;
pub mod saga;

pub use engine::{AccessControlEngine, AclOutcome};
pub use error::AclError;
pub use matrix::{carried_permissions, target_tokens};
pub use policy::AclPolicy;
pub use saga::{sanitize_acl, AclSaga, AclWrite, SagaPhase};
