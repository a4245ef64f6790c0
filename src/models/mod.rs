//! Data models for the pack membership application.
//!
//! Field names are the wire contract: they match the persisted column
//! names of the original API, serialized as snake_case JSON.

mod dashboard;
mod family;
mod leader;
mod logs;
mod permission;
mod person;
mod query;
mod scout;
mod status;

pub use dashboard::*;
pub use family::*;
pub use leader::*;
pub use logs::*;
pub use permission::*;
pub use person::*;
pub use query::*;
pub use scout::*;
pub use status::*;

/// Distinguishes "field absent" from "field set to null" in partial
/// update bodies. Absent deserializes to `None` via `#[serde(default)]`;
/// present (even as JSON null) deserializes to `Some(inner)`.
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
