//! Repository-specific knobs of ACL reconciliation.

use std::collections::BTreeSet;

use dmf_core::role::BOILERPLATE_TOKENS;
use dmf_core::AccessControlEntry;
use dmf_repository::AclPropagation;
use serde::{Deserialize, Serialize};

/// What the sanitize step strips and how first-time grants propagate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclPolicy {
    /// Tokens the repository injects as a side effect of ACL writes.
    pub boilerplate_tokens: BTreeSet<String>,
    /// Propagation mode of the additive write used for first-time grants.
    pub propagation: AclPropagation,
}

impl Default for AclPolicy {
    fn default() -> Self {
        Self {
            boilerplate_tokens: BOILERPLATE_TOKENS.iter().map(|t| t.to_string()).collect(),
            propagation: AclPropagation::RepositoryDetermined,
        }
    }
}

impl AclPolicy {
    /// Whether `token` is repository boilerplate.
    pub fn is_boilerplate(&self, token: &str) -> bool {
        self.boilerplate_tokens.contains(token)
    }

    /// The writable form of `entries`.
    ///
    /// Drops inherited entries, strips boilerplate tokens, and drops
    /// entries left with no tokens. Applying it twice changes nothing.
    pub fn clean(&self, entries: &[AccessControlEntry]) -> Vec<AccessControlEntry> {
        entries
            .iter()
            .filter(|e| e.is_direct)
            .map(|e| AccessControlEntry {
                permissions: e
                    .permissions
                    .iter()
                    .filter(|t| !self.is_boilerplate(t))
                    .cloned()
                    .collect(),
                ..e.clone()
            })
            .filter(|e| !e.permissions.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmf_core::role::{BOILERPLATE_ALL, BOILERPLATE_BASE_READ};
    use dmf_core::Principal;
    use proptest::prelude::*;

    fn p(id: &str) -> Principal {
        Principal::new(id).unwrap()
    }

    #[test]
    fn test_clean_strips_boilerplate_and_inherited() {
        let policy = AclPolicy::default();
        let cleaned = policy.clean(&[
            AccessControlEntry::direct(p("bob"), ["cmis:read", BOILERPLATE_BASE_READ]),
            AccessControlEntry::inherited(p("GROUP_EVERYONE"), ["cmis:read"]),
            AccessControlEntry::direct(p("carol"), [BOILERPLATE_ALL]),
        ]);
        assert_eq!(cleaned, vec![AccessControlEntry::direct(p("bob"), ["cmis:read"])]);
    }

    fn entry() -> impl Strategy<Value = AccessControlEntry> {
        let token = prop_oneof![
            Just("cmis:read".to_string()),
            Just("cmis:write".to_string()),
            Just("cmis:all".to_string()),
            Just(BOILERPLATE_ALL.to_string()),
            Just(BOILERPLATE_BASE_READ.to_string()),
            Just(dmf_core::Role::Editor.marker_token()),
        ];
        (
            "[a-z]{1,6}",
            prop::collection::btree_set(token, 0..5),
            any::<bool>(),
        )
            .prop_map(|(name, permissions, is_direct)| AccessControlEntry {
                principal: Principal::new(name).unwrap(),
                permissions,
                is_direct,
            })
    }

    proptest! {
        /// Cleaning is idempotent.
        #[test]
        fn clean_is_idempotent(entries in prop::collection::vec(entry(), 0..8)) {
            let policy = AclPolicy::default();
            let once = policy.clean(&entries);
            prop_assert_eq!(policy.clean(&once), once);
        }

        /// Cleaned entries are direct and boilerplate-free.
        #[test]
        fn clean_output_is_writable(entries in prop::collection::vec(entry(), 0..8)) {
            let policy = AclPolicy::default();
            for e in policy.clean(&entries) {
                prop_assert!(e.is_direct);
                prop_assert!(!e.permissions.is_empty());
                prop_assert!(e.permissions.iter().all(|t| !policy.is_boilerplate(t)));
            }
        }
    }
}
