use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// What an authenticated principal may do, resolved once per request and
/// passed to every authorization decision.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Capabilities {
    pub user_id: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_manager: bool,
    pub can_access: bool,
}

impl Capabilities {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        let is_admin = role == Role::Admin;
        let is_manager = role == Role::Manager;
        Self {
            user_id: user_id.into(),
            role,
            is_admin,
            is_manager,
            can_access: is_admin || is_manager,
        }
    }
}
