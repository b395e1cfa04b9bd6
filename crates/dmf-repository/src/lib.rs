//! # dmf-repository — Repository Protocol Boundary
//!
//! Everything the engines know about the remote document repository
//! passes through this crate:
//!
//! - [`client`]: the [`Repository`] trait, the object types it returns,
//!   and the content stream it accepts.
//! - [`session`]: [`Session`] and [`Connection`], with an explicit
//!   login-ticket lifecycle owned by each session.
//! - [`config`]: [`SessionConfig`], loaded from the environment.
//! - [`memory`]: [`InMemoryRepository`], a complete in-process
//!   implementation with fault injection.
//!
//! ## Architecture
//!
//! The engines are generic over `R: Repository`. They never see wire
//! formats or transport errors, only [`dmf_core::RepositoryError`].
//! Authentication is out of scope: a [`Connection`] arrives already
//! authenticated, and the ticket it carries is opaque.

pub mod client;
pub mod config;
pub mod memory;
pub mod session;

pub use client::{
    join_path, object_exists, AclPropagation, ContentStream, Document, Folder, Repository,
    RepositoryObject, VersioningState,
};
pub use config::{ConfigError, SessionConfig};
pub use memory::{InMemoryRepository, RepositoryCall};
pub use session::{Connection, LoginTicket, Session};
