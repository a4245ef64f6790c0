//! User permission model mapping external WordPress identities to roles.

use serde::{Deserialize, Serialize};

use super::PersonWithFamily;

/// Access role granted to a WordPress user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

/// Mapping from a WordPress user to a person and a role.
///
/// `granted_by` points at another permission; chains are kept acyclic
/// by the repository on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPermission {
    pub id: i64,
    pub wordpress_user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<i64>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<i64>,
    pub granted_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Permission with its person and granting permission loaded.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDetail {
    #[serde(flatten)]
    pub permission: UserPermission,
    pub person: Option<PersonWithFamily>,
    pub granted_by_permission: Option<Box<UserPermission>>,
}

/// Request body for creating a permission.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePermissionRequest {
    pub wordpress_user_id: i64,
    pub person_id: i64,
    pub role: Role,
    #[serde(default)]
    pub granted_by: Option<i64>,
    #[serde(default)]
    pub granted_at: Option<String>,
}

/// Request body for a partial permission update.
///
/// `granted_by`, when present, replaces the stored value (including
/// explicit null to clear the grantor).
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePermissionRequest {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default, with = "super::double_option")]
    pub granted_by: Option<Option<i64>>,
    #[serde(default)]
    pub granted_at: Option<String>,
}
