//! # Roles and Permission Tokens
//!
//! Coarse-grained roles and the low-level permission tokens the
//! repository stores in access-control entries.
//!
//! A role is recorded on an entry by a *marker token* in the repository's
//! system-model namespace (`{...system/1.0}cmobject.Editor`). Read and
//! write capability are carried separately by the protocol's basic
//! permission tokens (`cmis:read`, `cmis:write`, `cmis:all`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace of repository system-model tokens, including role markers.
pub const SYSTEM_MODEL_NAMESPACE: &str = "{http://www.alfresco.org/model/system/1.0}";

/// Namespace of repository security-model tokens.
pub const SECURITY_MODEL_NAMESPACE: &str = "{http://www.alfresco.org/model/security/1.0}";

/// Read token the repository attaches to entries on permission writes.
pub const BOILERPLATE_BASE_READ: &str = "{http://www.alfresco.org/model/system/1.0}base.Read";

/// Write token the repository attaches to entries on permission writes.
pub const BOILERPLATE_BASE_WRITE: &str = "{http://www.alfresco.org/model/system/1.0}base.Write";

/// Full-control token the repository attaches to entries on permission writes.
pub const BOILERPLATE_ALL: &str = "{http://www.alfresco.org/model/security/1.0}All.All";

/// Every token the repository injects as a side effect of an ACL write.
pub const BOILERPLATE_TOKENS: [&str; 3] =
    [BOILERPLATE_ALL, BOILERPLATE_BASE_READ, BOILERPLATE_BASE_WRITE];

/// Prefix shared by every role marker token.
const MARKER_PREFIX: &str = "cmobject.";

/// A coarse-grained repository role.
///
/// Roles are not ordered. Declaration order matters only for marker
/// inference: when an entry carries several markers, the first role in
/// this list wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// May read and edit content and add children.
    Collaborator,
    /// May read and edit content.
    Editor,
    /// May read content.
    Consumer,
    /// Full control.
    Coordinator,
    /// May read and add children.
    Contributor,
}

impl Role {
    /// All roles in declaration order.
    pub const ALL: [Role; 5] = [
        Role::Collaborator,
        Role::Editor,
        Role::Consumer,
        Role::Coordinator,
        Role::Contributor,
    ];

    /// Returns the role name as the repository spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collaborator => "Collaborator",
            Self::Editor => "Editor",
            Self::Consumer => "Consumer",
            Self::Coordinator => "Coordinator",
            Self::Contributor => "Contributor",
        }
    }

    /// The marker token recording this role on an entry.
    pub fn marker_token(&self) -> String {
        format!("{SYSTEM_MODEL_NAMESPACE}{MARKER_PREFIX}{}", self.as_str())
    }

    /// Infer the role recorded by a set of permission tokens.
    ///
    /// Tests each role's marker in declaration order against the tokens
    /// and returns the first that is present. Tokens are compared exactly.
    pub fn infer<'a, I>(tokens: I) -> Option<Role>
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: Clone,
    {
        let tokens = tokens.into_iter();
        Self::ALL.into_iter().find(|role| {
            let marker = role.marker_token();
            tokens.clone().any(|t| t == marker)
        })
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected role name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role {0:?}; expected one of Collaborator, Editor, Consumer, Coordinator, Contributor")]
pub struct UnknownRole(pub String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// The protocol's basic permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BasicPermission {
    /// `cmis:read`
    Read,
    /// `cmis:write`
    Write,
    /// `cmis:all`
    All,
}

impl BasicPermission {
    /// The permission token as stored on an entry.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Read => "cmis:read",
            Self::Write => "cmis:write",
            Self::All => "cmis:all",
        }
    }
}

impl std::fmt::Display for BasicPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}
