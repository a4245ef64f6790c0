//! Family model and request DTOs.

use serde::{Deserialize, Serialize};

use super::Person;

/// A household that persons belong to. Soft-deleted rows stay in the
/// table but drop out of every default query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// Family with its non-deleted members loaded, grouped by person type.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyDetail {
    #[serde(flatten)]
    pub family: Family,
    pub persons: Vec<Person>,
    pub scouts: Vec<Person>,
    pub parents: Vec<Person>,
    pub siblings: Vec<Person>,
    pub leaders: Vec<Person>,
}

/// Request body for creating a family.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFamilyRequest {
    pub name: String,
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub primary_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for a partial family update.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFamilyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub primary_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for collapsing a duplicate record into a canonical one.
/// Shared by the family and person merge endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub primary_id: i64,
    pub merge_id: i64,
}
