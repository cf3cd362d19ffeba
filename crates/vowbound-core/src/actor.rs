//! The user acting on the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's role at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    /// The game master.
    Master,
}

/// An authenticated user issuing commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn player(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            role: Role::Player,
        }
    }

    #[must_use]
    pub fn master(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            role: Role::Master,
        }
    }

    #[must_use]
    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    /// Returns `true` if this actor is the user `owner_id`.
    #[must_use]
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_value(Role::Master).unwrap();
        assert_eq!(json, serde_json::json!("master"));
    }

    #[test]
    fn test_owns_compares_user_ids() {
        let id = Uuid::new_v4();
        let actor = Actor::player(id, "Nobara");

        assert!(actor.owns(id));
        assert!(!actor.owns(Uuid::new_v4()));
        assert!(!actor.is_master());
    }
}
