//! Announcements and their per-user read state.

use crate::collection::{Identified, Searchable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's "seen" mark on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenMarker {
    pub user_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notification_seen_status: Vec<SeenMarker>,
}

impl Notification {
    /// Read state is computed by the server; the live event never carries it.
    pub fn is_read_by(&self, user_id: &str) -> bool {
        self.notification_seen_status
            .iter()
            .any(|seen| seen.user_ref == user_id)
    }
}

impl Identified for Notification {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Searchable for Notification {
    fn matches(&self, term: &str) -> bool {
        self.title.to_lowercase().contains(term)
    }
}
