use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity as asserted by the upstream gateway. The scheduling core
/// trusts these values and performs no credential verification of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Professional,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Role::Patient),
            "professional" => Some(Role::Professional),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn can_decide_blocks(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_manage_templates(&self) -> bool {
        matches!(self, Role::Professional | Role::Admin)
    }
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}
