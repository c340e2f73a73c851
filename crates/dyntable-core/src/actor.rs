use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Table;
use crate::enums::Visibility;

/// Identity of the acting principal, used only for authorization decisions.
///
/// Token-based external callers carry an explicit set of permitted tables;
/// interactive users are checked against ownership, role, and visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
    /// Permitted table set for scoped access tokens. `None` means the actor
    /// is not token-scoped.
    pub table_access: Option<Vec<Uuid>>,
}

impl Actor {
    pub fn user(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            is_admin: false,
            table_access: None,
        }
    }

    pub fn admin(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Actor::user(user_id, email)
        }
    }

    pub fn with_table_access(mut self, tables: Vec<Uuid>) -> Self {
        self.table_access = Some(tables);
        self
    }

    /// Read access: owner and admin always; token scope when present;
    /// otherwise the table's visibility decides.
    pub fn can_read(&self, table: &Table) -> bool {
        if self.is_admin || table.owner_id == self.user_id {
            return true;
        }
        match &self.table_access {
            Some(tables) => tables.contains(&table.id),
            None => matches!(table.visibility, Visibility::Public | Visibility::Shared),
        }
    }

    /// Write access: owner, admin, or a write-scoped token covering the table.
    pub fn can_write(&self, table: &Table) -> bool {
        if self.is_admin || table.owner_id == self.user_id {
            return true;
        }
        self.table_access
            .as_ref()
            .is_some_and(|tables| tables.contains(&table.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_gates_non_owner_reads() {
        let owner = Uuid::new_v4();
        let mut table = Table::new(owner, "inventory");
        let stranger = Actor::user(Uuid::new_v4(), "someone@example.com");

        assert!(!stranger.can_read(&table));
        table.visibility = Visibility::Public;
        assert!(stranger.can_read(&table));
        assert!(!stranger.can_write(&table));
    }

    #[test]
    fn token_scope_overrides_visibility() {
        let table = Table::new(Uuid::new_v4(), "inventory");
        let scoped =
            Actor::user(Uuid::new_v4(), "api@example.com").with_table_access(vec![table.id]);
        let unscoped =
            Actor::user(Uuid::new_v4(), "api@example.com").with_table_access(vec![Uuid::new_v4()]);

        assert!(scoped.can_read(&table));
        assert!(scoped.can_write(&table));
        assert!(!unscoped.can_read(&table));
    }

    #[test]
    fn admin_bypasses_ownership() {
        let table = Table::new(Uuid::new_v4(), "inventory");
        let admin = Actor::admin(Uuid::new_v4(), "admin@example.com");
        assert!(admin.can_read(&table));
        assert!(admin.can_write(&table));
    }
}
