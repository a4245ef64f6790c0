//! Adult leader model and request DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{PersonWithFamily, YptStatus, YptTraining};

/// Adult leader record, 1:1 with a person of type `adult_leader`.
///
/// `days_until_ypt_expiration` and `ypt_status_formatted` are derived
/// from `ypt_expiration_date` at read time and never stored.
#[derive(Debug, Clone, Serialize)]
pub struct AdultLeader {
    pub id: i64,
    pub person_id: i64,
    pub positions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ypt_status: Option<YptTraining>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ypt_completion_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ypt_expiration_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_expiration_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_ypt_expiration: Option<i64>,
    pub ypt_status_formatted: YptStatus,
}

/// Leader with its person (and family) loaded.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderDetail {
    #[serde(flatten)]
    pub leader: AdultLeader,
    pub person: Option<PersonWithFamily>,
}

/// Request body for creating a leader record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeaderRequest {
    pub person_id: i64,
    #[serde(default)]
    pub positions: Option<Vec<String>>,
    #[serde(default)]
    pub ypt_status: Option<YptTraining>,
    #[serde(default)]
    pub ypt_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub ypt_expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_expiration_date: Option<NaiveDate>,
}

/// Request body for a partial leader update.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLeaderRequest {
    #[serde(default)]
    pub person_id: Option<i64>,
    #[serde(default)]
    pub positions: Option<Vec<String>>,
    #[serde(default)]
    pub ypt_status: Option<YptTraining>,
    #[serde(default)]
    pub ypt_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub ypt_expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_expiration_date: Option<NaiveDate>,
}

/// Request body for adding or removing a single position string.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRequest {
    pub position: String,
}
