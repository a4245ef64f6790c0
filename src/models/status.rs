//! Expiration status derivation.
//!
//! Pure date arithmetic: callers pass `today` explicitly so the
//! classification is deterministic and testable. Buckets are half-open
//! `[lower, upper)` over the signed day difference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Signed number of whole days between `today` and an optional expiration date.
///
/// Negative means the date is in the past. `None` in, `None` out.
pub fn days_until(expiration: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    expiration.map(|date| (date - today).num_days())
}

/// Derived YPT compliance bucket for adult leaders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YptStatus {
    Unknown,
    Expired,
    ExpiringSoon,
    #[serde(rename = "expiring_in_90")]
    ExpiringIn90,
    Current,
}

impl YptStatus {
    /// Classify a day count: expired below 0, expiring_soon below 30,
    /// expiring_in_90 below 90, current otherwise.
    pub fn classify(days: Option<i64>) -> Self {
        match days {
            None => YptStatus::Unknown,
            Some(d) if d < 0 => YptStatus::Expired,
            Some(d) if d < 30 => YptStatus::ExpiringSoon,
            Some(d) if d < 90 => YptStatus::ExpiringIn90,
            Some(_) => YptStatus::Current,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YptStatus::Unknown => "unknown",
            YptStatus::Expired => "expired",
            YptStatus::ExpiringSoon => "expiring_soon",
            YptStatus::ExpiringIn90 => "expiring_in_90",
            YptStatus::Current => "current",
        }
    }
}

/// Derived registration bucket for scouts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationStatus {
    Unknown,
    Expired,
    ExpiringSoon,
    #[serde(rename = "expiring_in_60")]
    ExpiringIn60,
    Active,
}

impl ExpirationStatus {
    /// Classify a day count: expired below 0, expiring_soon below 30,
    /// expiring_in_60 below 60, active otherwise.
    pub fn classify(days: Option<i64>) -> Self {
        match days {
            None => ExpirationStatus::Unknown,
            Some(d) if d < 0 => ExpirationStatus::Expired,
            Some(d) if d < 30 => ExpirationStatus::ExpiringSoon,
            Some(d) if d < 60 => ExpirationStatus::ExpiringIn60,
            Some(_) => ExpirationStatus::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpirationStatus::Unknown => "unknown",
            ExpirationStatus::Expired => "expired",
            ExpirationStatus::ExpiringSoon => "expiring_soon",
            ExpirationStatus::ExpiringIn60 => "expiring_in_60",
            ExpirationStatus::Active => "active",
        }
    }
}
