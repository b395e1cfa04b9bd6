//! # Role Transition Matrix
//!
//! Maps a requested role and the principal's current role onto the
//! permission tokens of the entry written for the principal.
//!
//! Every written entry carries the requested role's marker token. The
//! basic permissions carried alongside it depend only on the *current*
//! role, read off the entry being replaced:
//!
//! | current      | carried              |
//! |--------------|----------------------|
//! | Collaborator | READ, WRITE          |
//! | Editor       | READ, WRITE          |
//! | Consumer     | READ                 |
//! | Coordinator  | READ, WRITE, ALL     |
//! | Contributor  | READ                 |
//! | none         | (marker only)        |
//!
//! A first-time grant therefore writes the marker alone. Requesting the
//! role the principal already holds is a no-op and writes nothing.

use std::collections::BTreeSet;

use dmf_core::{BasicPermission, Role};

/// Basic permissions carried over from the principal's current role.
pub fn carried_permissions(current: Option<Role>) -> &'static [BasicPermission] {
    use BasicPermission::{All, Read, Write};
    match current {
        Some(Role::Collaborator | Role::Editor) => &[Read, Write],
        Some(Role::Consumer | Role::Contributor) => &[Read],
        Some(Role::Coordinator) => &[Read, Write, All],
        None => &[],
    }
}

/// Tokens of the entry written when `requested` replaces `current`.
///
/// Returns `None` when `requested == current`: the grant is already in
/// place and nothing is written.
pub fn target_tokens(requested: Role, current: Option<Role>) -> Option<BTreeSet<String>> {
    if current == Some(requested) {
        return None;
    }
    let mut tokens = BTreeSet::from([requested.marker_token()]);
    tokens.extend(
        carried_permissions(current)
            .iter()
            .map(|p| p.token().to_string()),
    );
    Some(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_role_is_noop() {
        for role in Role::ALL {
            assert!(target_tokens(role, Some(role)).is_none(), "{role}");
        }
    }

    #[test]
    fn test_first_grant_is_marker_only() {
        let tokens = target_tokens(Role::Editor, None).unwrap();
        assert_eq!(tokens, BTreeSet::from([Role::Editor.marker_token()]));
    }

    #[test]
    fn test_consumer_over_coordinator_keeps_all() {
        let tokens = target_tokens(Role::Consumer, Some(Role::Coordinator)).unwrap();
        let expected = BTreeSet::from([
            Role::Consumer.marker_token(),
            "cmis:read".to_string(),
            "cmis:write".to_string(),
            "cmis:all".to_string(),
        ]);
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_marker_is_requested_role_not_current() {
        let tokens = target_tokens(Role::Coordinator, Some(Role::Contributor)).unwrap();
        assert!(tokens.contains(&Role::Coordinator.marker_token()));
        assert!(!tokens.contains(&Role::Contributor.marker_token()));
        assert!(tokens.contains("cmis:read"));
        assert!(!tokens.contains("cmis:write"));
    }
}
