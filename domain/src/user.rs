//! Registered users as listed on the admin dashboard.

use crate::collection::{Identified, Searchable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Name {
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Blocked,
    #[default]
    Unblocked,
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Blocked => write!(fmt, "Blocked"),
            UserStatus::Unblocked => write!(fmt, "Unblocked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Name,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: UserStatus,
    /// Sequences the user has submitted; only the count is shown.
    #[serde(default)]
    pub sequences: Vec<Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserDetails {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name.first, self.name.last)
    }

    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

impl Identified for UserDetails {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Searchable for UserDetails {
    fn matches(&self, term: &str) -> bool {
        self.full_name().to_lowercase().contains(term) || self.email.to_lowercase().contains(term)
    }
}
