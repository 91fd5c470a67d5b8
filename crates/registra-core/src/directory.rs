//! # User Directory
//!
//! Minimal user store backing role lookups and the parent→child link.
//!
//! Authentication and session issuance live entirely outside the core;
//! the directory only records who exists, which role they hold, and
//! which student a parent account is linked to.

use crate::primitives::MAX_TITLE_LENGTH;
use crate::{RegistryError, Role, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub role: Role,
    /// For parent accounts: the linked student.
    pub child: Option<UserId>,
}

/// Payload for creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub full_name: String,
    pub role: Role,
    pub child: Option<UserId>,
}

/// The in-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: BTreeMap<UserId, User>,
    next_user_id: u64,
}

impl Directory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user. A parent's child link must reference an existing
    /// student.
    pub fn add(&mut self, spec: UserSpec) -> Result<UserId, RegistryError> {
        if spec.full_name.is_empty() || spec.full_name.len() > MAX_TITLE_LENGTH {
            return Err(RegistryError::InvalidInput(format!(
                "full name must be 1..={MAX_TITLE_LENGTH} bytes"
            )));
        }
        if let Some(child) = spec.child {
            let linked = self.get(child)?;
            if linked.role != Role::Student {
                return Err(RegistryError::InvalidInput(format!(
                    "child link {child:?} does not reference a student"
                )));
            }
        }

        let id = UserId(self.next_user_id);
        self.next_user_id = self.next_user_id.saturating_add(1);
        self.users.insert(
            id,
            User {
                id,
                full_name: spec.full_name,
                role: spec.role,
                child: spec.child,
            },
        );
        Ok(id)
    }

    /// Get a user by id.
    pub fn get(&self, id: UserId) -> Result<&User, RegistryError> {
        self.users.get(&id).ok_or(RegistryError::UserNotFound(id))
    }

    /// Reassign a user's role.
    pub fn assign_role(&mut self, id: UserId, role: Role) -> Result<(), RegistryError> {
        let user = self.users.get_mut(&id).ok_or(RegistryError::UserNotFound(id))?;
        user.role = role;
        Ok(())
    }

    /// Resolve the student linked to a parent account.
    pub fn child_of(&self, parent: UserId) -> Result<Option<UserId>, RegistryError> {
        Ok(self.get(parent)?.child)
    }

    /// All users in deterministic (id) order.
    pub fn list(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, role: Role) -> UserSpec {
        UserSpec {
            full_name: name.to_string(),
            role,
            child: None,
        }
    }

    #[test]
    fn add_and_lookup() {
        let mut dir = Directory::new();
        let id = dir.add(user("Ada", Role::Student)).expect("add");
        assert_eq!(dir.get(id).expect("get").full_name, "Ada");
        assert!(dir.get(UserId(99)).is_err());
    }

    #[test]
    fn parent_child_link_resolves() {
        let mut dir = Directory::new();
        let student = dir.add(user("Ada", Role::Student)).expect("add");
        let parent = dir
            .add(UserSpec {
                full_name: "Mx. Lovelace".to_string(),
                role: Role::Parent,
                child: Some(student),
            })
            .expect("add");
        assert_eq!(dir.child_of(parent).expect("child"), Some(student));
    }

    #[test]
    fn child_link_must_reference_student() {
        let mut dir = Directory::new();
        let faculty = dir.add(user("Dr. X", Role::Faculty)).expect("add");
        let err = dir
            .add(UserSpec {
                full_name: "P".to_string(),
                role: Role::Parent,
                child: Some(faculty),
            })
            .expect_err("not a student");
        assert!(matches!(err, RegistryError::InvalidInput(_)));
    }

    #[test]
    fn assign_role_updates_entry() {
        let mut dir = Directory::new();
        let id = dir.add(user("Ada", Role::Student)).expect("add");
        dir.assign_role(id, Role::Faculty).expect("assign");
        assert_eq!(dir.get(id).expect("get").role, Role::Faculty);
    }

    #[test]
    fn empty_name_rejected() {
        let mut dir = Directory::new();
        assert!(dir.add(user("", Role::Student)).is_err());
    }
}
