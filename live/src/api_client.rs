//! Authoritative fetches against the upstream API, used to refetch a
//! collection after an invalidation.

use async_trait::async_trait;
use domain::error::{DomainErrorKind, Error, ExternalErrorKind};
use domain::notification::Notification;
use domain::reconciler::Refetch;
use domain::user::UserDetails;
use log::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Dashboard summary; carries the registered users under `userDetails`.
pub const DASHBOARD_PATH: &str = "/admin/dashboard";
pub const NOTIFICATIONS_PATH: &str = "/notifications";

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, Error> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {url}");
        let body = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(unwrap_envelope(body))
    }

    /// Every registered user, in upstream order.
    pub async fn users(&self) -> Result<Vec<UserDetails>, Error> {
        let dashboard = self.get(DASHBOARD_PATH).await?;
        let users = dashboard
            .get("userDetails")
            .cloned()
            .ok_or_else(|| missing_field("userDetails"))?;
        decode_list(users)
    }

    /// Every notification visible to the session, with its seen markers.
    pub async fn notifications(&self) -> Result<Vec<Notification>, Error> {
        let body = self.get(NOTIFICATIONS_PATH).await?;
        let list = match body {
            Value::Array(_) => body,
            Value::Object(ref fields) => fields
                .get("notifications")
                .cloned()
                .ok_or_else(|| missing_field("notifications"))?,
            _ => return Err(missing_field("notifications")),
        };
        decode_list(list)
    }
}

/// Upstream responses may wrap their payload in `{ "data": ... }`.
fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut fields) if fields.contains_key("data") => {
            fields.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode_list<T: DeserializeOwned>(list: Value) -> Result<Vec<T>, Error> {
    Ok(serde_json::from_value(list)?)
}

fn missing_field(name: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::External(ExternalErrorKind::Other(format!(
            "response has no {name}"
        ))),
    }
}

/// The users collection of the admin dashboard.
pub struct UsersSource(pub ApiClient);

#[async_trait]
impl Refetch<UserDetails> for UsersSource {
    async fn refetch(&self) -> Result<Vec<UserDetails>, Error> {
        self.0.users().await
    }
}

/// The notifications collection of the announcements page and dashboard.
pub struct NotificationsSource(pub ApiClient);

#[async_trait]
impl Refetch<Notification> for NotificationsSource {
    async fn refetch(&self) -> Result<Vec<Notification>, Error> {
        self.0.notifications().await
    }
}
