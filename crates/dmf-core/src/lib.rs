//! # dmf-core — Foundational Types for the DMF Repository Façade
//!
//! This crate defines the value types shared by every engine in the
//! workspace. Every other crate depends on `dmf-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for repository identifiers.** `Principal`,
//!    `ObjectId`, `VersionTag`. No bare strings cross an engine boundary.
//!
//! 2. **Version suffixes are split exactly once.** `ObjectId::split_version()`
//!    is the only place that understands the `<series>;<label>` form, and
//!    `OperationStatus` always reports the bare id.
//!
//! 3. **Single `Role` enum.** Five variants, declared in marker-inference
//!    order. Adding a role forces every consumer of the transition matrix to
//!    handle it.
//!
//! 4. **Streams are rewound after hashing.** `ChecksumService::digest_stream()`
//!    seeks back to position zero on every path, so the caller can upload
//!    the same stream it just hashed.
//!
//! 5. **Closed error taxonomy.** Every error type in the workspace maps onto
//!    one `ErrorKind`, which is what callers see in a failed
//!    `OperationStatus`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dmf-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod acl;
pub mod digest;
pub mod error;
pub mod identity;
pub mod metadata;
pub mod role;
pub mod status;

// Re-export primary types for ergonomic imports.
pub use acl::{AccessControlEntry, AccessControlList};
pub use digest::{Checksum, ChecksumService, DigestAlgorithm};
pub use error::{ErrorKind, IdentityError, ParseError, RepositoryError};
pub use identity::{ObjectId, Principal, VersionTag};
pub use metadata::{MetadataType, PropertyMap, PropertyValue};
pub use role::{BasicPermission, Role};
pub use status::OperationStatus;
