//! Role and ownership checks.
//!
//! A single evaluation function instead of per-endpoint conditionals:
//! callers describe the action and whether the requester owns the target
//! resource, and get a yes/no back.

use crate::db::user::Role;

/// Actions a caller may attempt against platform resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read published content
    Read,
    /// Create new content
    Create,
    /// Modify existing content
    Update,
    /// Remove existing content
    Delete,
    /// Administrative operations (role changes, account removal)
    ManageUsers,
}

/// Evaluate whether `role` may perform `action`, given ownership of the
/// target resource.
///
/// Viewers only read; authors additionally create, and mutate what they
/// own; admins may do anything.
pub fn can(role: Role, is_owner: bool, action: Action) -> bool {
    match role {
        Role::Admin => true,
        Role::Author => match action {
            Action::Read | Action::Create => true,
            Action::Update | Action::Delete => is_owner,
            Action::ManageUsers => false,
        },
        Role::Viewer => matches!(action, Action::Read),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_reads_only() {
        assert!(can(Role::Viewer, false, Action::Read));
        assert!(!can(Role::Viewer, true, Action::Create));
        assert!(!can(Role::Viewer, true, Action::Update));
        assert!(!can(Role::Viewer, true, Action::ManageUsers));
    }

    #[test]
    fn test_author_mutates_own_content_only() {
        assert!(can(Role::Author, false, Action::Create));
        assert!(can(Role::Author, true, Action::Update));
        assert!(can(Role::Author, true, Action::Delete));
        assert!(!can(Role::Author, false, Action::Update));
        assert!(!can(Role::Author, false, Action::Delete));
        assert!(!can(Role::Author, true, Action::ManageUsers));
    }

    #[test]
    fn test_admin_can_do_anything() {
        for action in [
            Action::Read,
            Action::Create,
            Action::Update,
            Action::Delete,
            Action::ManageUsers,
        ] {
            assert!(can(Role::Admin, false, action));
        }
    }
}
