//! Scout model and request DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ExpirationStatus, PersonWithFamily};

/// Stored registration state, distinct from the date-derived
/// [`ExpirationStatus`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Active,
    Inactive,
    Suspended,
}

impl RegistrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationState::Active => "active",
            RegistrationState::Inactive => "inactive",
            RegistrationState::Suspended => "suspended",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(RegistrationState::Active),
            "inactive" => Some(RegistrationState::Inactive),
            "suspended" => Some(RegistrationState::Suspended),
            _ => None,
        }
    }
}

/// Stored YPT training completion state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YptTraining {
    Pending,
    Completed,
    Expired,
}

impl YptTraining {
    pub fn as_str(&self) -> &'static str {
        match self {
            YptTraining::Pending => "pending",
            YptTraining::Completed => "completed",
            YptTraining::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(YptTraining::Pending),
            "completed" => Some(YptTraining::Completed),
            "expired" => Some(YptTraining::Expired),
            _ => None,
        }
    }
}

/// Scout program record, 1:1 with a person of type `scout`.
///
/// `days_until_expiration` and `expiration_status` are derived from
/// `registration_expiration_date` at read time and never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Scout {
    pub id: i64,
    pub person_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub den: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_expiration_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_status: Option<RegistrationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ypt_status: Option<YptTraining>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until_expiration: Option<i64>,
    pub expiration_status: ExpirationStatus,
}

/// Scout with its person (and family) loaded.
#[derive(Debug, Clone, Serialize)]
pub struct ScoutDetail {
    #[serde(flatten)]
    pub scout: Scout,
    pub person: Option<PersonWithFamily>,
}

/// Request body for creating a scout record.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateScoutRequest {
    pub person_id: i64,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub den: Option<String>,
    #[serde(default)]
    pub registration_expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_status: Option<RegistrationState>,
    #[serde(default)]
    pub ypt_status: Option<YptTraining>,
    #[serde(default)]
    pub program: Option<String>,
}

/// Request body for a partial scout update.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateScoutRequest {
    #[serde(default)]
    pub person_id: Option<i64>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub den: Option<String>,
    #[serde(default)]
    pub registration_expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub registration_status: Option<RegistrationState>,
    #[serde(default)]
    pub ypt_status: Option<YptTraining>,
    #[serde(default)]
    pub program: Option<String>,
}
