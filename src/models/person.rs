//! Person model and request DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{AdultLeader, Family, Scout};

/// Role a person plays in the pack roster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersonType {
    Scout,
    Parent,
    Sibling,
    AdultLeader,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonType::Scout => "scout",
            PersonType::Parent => "parent",
            PersonType::Sibling => "sibling",
            PersonType::AdultLeader => "adult_leader",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scout" => Some(PersonType::Scout),
            "parent" => Some(PersonType::Parent),
            "sibling" => Some(PersonType::Sibling),
            "adult_leader" => Some(PersonType::AdultLeader),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    M,
    F,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
            Gender::Other => "Other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "M" => Some(Gender::M),
            "F" => Some(Gender::F),
            "Other" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// A tracked individual: scout, parent, sibling, or adult leader.
///
/// `bsa_member_id` and `email` are unique across non-deleted persons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bsa_member_id: Option<String>,
    pub person_type: PersonType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Person {
    /// Display name assembled from the populated name parts.
    pub fn full_name(&self) -> String {
        [
            self.prefix.as_deref(),
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Person with its one-hop relations loaded.
#[derive(Debug, Clone, Serialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub family: Option<Family>,
    pub scout: Option<Scout>,
    pub leader: Option<AdultLeader>,
}

/// Person with its family loaded; used when embedding into scout,
/// leader, and permission payloads.
#[derive(Debug, Clone, Serialize)]
pub struct PersonWithFamily {
    #[serde(flatten)]
    pub person: Person,
    pub family: Option<Family>,
}

/// Request body for creating a person.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePersonRequest {
    #[serde(default)]
    pub family_id: Option<i64>,
    pub person_type: PersonType,
    #[serde(default)]
    pub bsa_member_id: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Request body for a partial person update.
///
/// Nullable columns use the double-option pattern: a present field
/// replaces the stored value, and explicit null clears it (detaching
/// the person from its family, blanking an email, and so on). Absent
/// fields are left untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePersonRequest {
    #[serde(default, with = "super::double_option")]
    pub family_id: Option<Option<i64>>,
    #[serde(default)]
    pub person_type: Option<PersonType>,
    #[serde(default, with = "super::double_option")]
    pub bsa_member_id: Option<Option<String>>,
    #[serde(default, with = "super::double_option")]
    pub prefix: Option<Option<String>>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, with = "super::double_option")]
    pub middle_name: Option<Option<String>>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, with = "super::double_option")]
    pub suffix: Option<Option<String>>,
    #[serde(default, with = "super::double_option")]
    pub nickname: Option<Option<String>>,
    #[serde(default, with = "super::double_option")]
    pub gender: Option<Option<Gender>>,
    #[serde(default, with = "super::double_option")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, with = "super::double_option")]
    pub age: Option<Option<i64>>,
    #[serde(default, with = "super::double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, with = "super::double_option")]
    pub phone: Option<Option<String>>,
}
