//! Operational record models: sync logs, audit logs, settings.

use serde::{Deserialize, Serialize};

/// Outcome record of one external sync run. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: i64,
    pub sync_type: String,
    pub status: String,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub records_processed: i64,
    pub records_created: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<i64>,
    pub created_at: String,
}

/// Fields for appending a sync log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSyncRequest {
    pub sync_type: String,
    pub status: String,
    pub started_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub records_processed: i64,
    #[serde(default)]
    pub records_created: i64,
    #[serde(default)]
    pub records_updated: i64,
    #[serde(default)]
    pub records_skipped: i64,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub triggered_by: Option<i64>,
}

/// One entry in the mutation audit trail. Append-only, written by the
/// repository on every create/update/delete/merge.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<serde_json::Value>,
    pub created_at: String,
}

/// Keyed configuration value.
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub setting_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting_value: Option<String>,
    pub updated_at: String,
}

/// Request body for upserting a setting.
#[derive(Debug, Clone, Deserialize)]
pub struct SetSettingRequest {
    pub value: Option<String>,
}
