//! Authorization decisions consumed by the dispatcher.
//!
//! The dispatcher only ever asks a yes/no question; how the answer is
//! produced is up to the [`Authorizer`] handed to it at construction.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::ActorId;

/// Actions an operator can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    View,
    Execute,
    ViewLogs,
}

impl Permission {
    pub const ALL: [Permission; 3] = [Self::View, Self::Execute, Self::ViewLogs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Execute => "execute",
            Self::ViewLogs => "view_logs",
        }
    }
}

pub trait Authorizer: Send + Sync {
    fn can_perform(&self, actor: ActorId, permission: Permission) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(ActorId, Permission) -> bool + Send + Sync,
{
    fn can_perform(&self, actor: ActorId, permission: Permission) -> bool {
        self(actor, permission)
    }
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_perform(&self, _actor: ActorId, _permission: Permission) -> bool {
        true
    }
}

/// Per-permission allow-lists of actor ids.
///
/// A permission with no entry, or an empty set, allows every actor.
#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    grants: HashMap<Permission, HashSet<ActorId>>,
}

impl PermissionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission: Permission, actors: impl IntoIterator<Item = ActorId>) -> Self {
        self.grants.entry(permission).or_default().extend(actors);
        self
    }

    pub fn actors(&self, permission: Permission) -> Option<&HashSet<ActorId>> {
        self.grants.get(&permission)
    }
}

impl Authorizer for PermissionPolicy {
    fn can_perform(&self, actor: ActorId, permission: Permission) -> bool {
        match self.grants.get(&permission) {
            Some(actors) if !actors.is_empty() => actors.contains(&actor),
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_policy_allows_everyone() {
        let policy = PermissionPolicy::new();
        for permission in Permission::ALL {
            assert!(policy.can_perform(42, permission));
        }
    }

    #[test]
    fn listed_permission_restricts_to_listed_actors() {
        let policy = PermissionPolicy::new().grant(Permission::Execute, [1, 2]);
        assert!(policy.can_perform(1, Permission::Execute));
        assert!(!policy.can_perform(3, Permission::Execute));
        // Other permissions stay open.
        assert!(policy.can_perform(3, Permission::View));
    }

    #[test]
    fn granting_nobody_keeps_permission_open() {
        let policy = PermissionPolicy::new().grant(Permission::ViewLogs, []);
        assert!(policy.can_perform(9, Permission::ViewLogs));
    }

    #[test]
    fn closures_are_authorizers() {
        let only_view = |_actor: ActorId, p: Permission| p == Permission::View;
        assert!(only_view.can_perform(1, Permission::View));
        assert!(!only_view.can_perform(1, Permission::Execute));
    }
}
