//! Dashboard aggregate payloads.

use serde::Serialize;

use super::{FamilyDetail, LeaderDetail, ScoutDetail, SyncLog};

/// Count blocks for the dashboard landing page.
#[derive(Debug, Serialize)]
pub struct DashboardStatistics {
    pub families: FamilyCounts,
    pub persons: PersonCounts,
    pub scouts: ScoutCounts,
    pub leaders: LeaderCounts,
}

#[derive(Debug, Serialize)]
pub struct FamilyCounts {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Serialize)]
pub struct PersonCounts {
    pub total: i64,
    pub scouts: i64,
    pub parents: i64,
    pub siblings: i64,
    pub leaders: i64,
    pub orphaned: i64,
}

#[derive(Debug, Serialize)]
pub struct ScoutCounts {
    pub total: i64,
    pub active: i64,
    pub expiring_soon: i64,
    pub expired: i64,
}

#[derive(Debug, Serialize)]
pub struct LeaderCounts {
    pub total: i64,
    pub ypt_current: i64,
    pub ypt_expiring_soon: i64,
    pub ypt_expired: i64,
    pub ypt_unknown: i64,
}

/// Scouts and leaders whose registrations/YPT lapse within a window.
#[derive(Debug, Serialize)]
pub struct ExpiringRecords {
    pub scouts: Vec<ScoutDetail>,
    pub leaders: Vec<LeaderDetail>,
}

/// Latest sync run per external source.
#[derive(Debug, Serialize)]
pub struct SyncStatus {
    pub scoutbook: Option<SyncLog>,
    pub mailchimp: Option<SyncLog>,
}

/// A family plus per-type member counts.
#[derive(Debug, Serialize)]
pub struct FamilyMembersReport {
    pub family: FamilyDetail,
    pub summary: FamilySummary,
}

#[derive(Debug, Serialize)]
pub struct FamilySummary {
    pub total_members: usize,
    pub scouts: usize,
    pub parents: usize,
    pub siblings: usize,
    pub leaders: usize,
}

/// Active-scout head count for one den.
#[derive(Debug, Serialize)]
pub struct DenCount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub den: Option<String>,
    pub count: i64,
}

/// Active-scout head count for one rank.
#[derive(Debug, Serialize)]
pub struct RankCount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    pub count: i64,
}
