//! # Access-Control Entries and Lists
//!
//! Value types for the repository's ACL representation. An entry is
//! either *direct* (written on the object itself) or inherited from an
//! ancestor container. Inherited entries are recomputed by the repository
//! and must never be submitted back in a write.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::Principal;
use crate::role::Role;

/// One principal's permission tokens on one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    /// Who the entry applies to.
    pub principal: Principal,
    /// Permission tokens, including any role marker.
    pub permissions: BTreeSet<String>,
    /// `false` when inherited from an ancestor.
    pub is_direct: bool,
}

impl AccessControlEntry {
    /// A direct entry carrying the given tokens.
    pub fn direct<I, T>(principal: Principal, permissions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            principal,
            permissions: permissions.into_iter().map(Into::into).collect(),
            is_direct: true,
        }
    }

    /// An inherited entry carrying the given tokens.
    pub fn inherited<I, T>(principal: Principal, permissions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            is_direct: false,
            ..Self::direct(principal, permissions)
        }
    }

    /// Whether the entry carries `token`.
    pub fn has_token(&self, token: &str) -> bool {
        self.permissions.contains(token)
    }

    /// The role recorded by this entry's marker token, if any.
    pub fn role(&self) -> Option<Role> {
        Role::infer(self.permissions.iter().map(String::as_str))
    }
}

/// The ordered entries attached to one repository object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlList {
    entries: Vec<AccessControlEntry>,
}

impl AccessControlList {
    /// Wrap a list of entries, preserving order.
    pub fn new(entries: Vec<AccessControlEntry>) -> Self {
        Self { entries }
    }

    /// All entries in repository order.
    pub fn entries(&self) -> &[AccessControlEntry] {
        &self.entries
    }

    /// Consume into the underlying entries.
    pub fn into_entries(self) -> Vec<AccessControlEntry> {
        self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose principal equals `principal` exactly.
    pub fn find(&self, principal: &Principal) -> Option<&AccessControlEntry> {
        self.entries.iter().find(|e| &e.principal == principal)
    }

    /// First *direct* entry for `principal`.
    pub fn find_direct(&self, principal: &Principal) -> Option<&AccessControlEntry> {
        self.entries
            .iter()
            .find(|e| e.is_direct && &e.principal == principal)
    }

    /// Only the direct entries, in order.
    pub fn direct_entries(&self) -> impl Iterator<Item = &AccessControlEntry> {
        self.entries.iter().filter(|e| e.is_direct)
    }
}

impl FromIterator<AccessControlEntry> for AccessControlList {
    fn from_iter<I: IntoIterator<Item = AccessControlEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
