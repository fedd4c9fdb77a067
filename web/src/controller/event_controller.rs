//! Hooks through which the upstream API announces changes that live clients
//! must learn about.
//!
//! Each hook publishes one [`DomainEvent`]; the push hub turns it into a named
//! live event on the relevant connections.

use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use events::DomainEvent;
use log::*;
use serde::Serialize;
use serde_json::Value;
use service::config::Config;
use utoipa::ToSchema;

pub(crate) const HOOK_SECRET_HEADER: &str = "x-hook-secret";

#[derive(Debug, Serialize, ToSchema)]
pub struct HookResponse {
    pub status: String,
}

impl HookResponse {
    fn reply(status_code: StatusCode, status: &str) -> (StatusCode, Json<HookResponse>) {
        (
            status_code,
            Json(HookResponse {
                status: status.to_string(),
            }),
        )
    }
}

fn hook_secret_matches(config: &Config, headers: &HeaderMap) -> bool {
    match config.event_hook_secret() {
        Some(expected_secret) => {
            let provided_secret = headers
                .get(HOOK_SECRET_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            provided_secret == expected_secret
        }
        None => true,
    }
}

fn has_id(record: &Value) -> bool {
    record
        .get("_id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty())
}

/// POST announce a newly registered user to admin dashboards
#[utoipa::path(
    post,
    path = "/events/users",
    request_body(content = Object, description = "The registered user, carrying its `_id`"),
    responses(
        (status = 200, description = "Published as `new-user`", body = HookResponse),
        (status = 401, description = "Missing or wrong hook secret", body = HookResponse),
        (status = 422, description = "The record has no `_id`", body = HookResponse)
    )
)]
pub async fn user_registered(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(user): Json<Value>,
) -> (StatusCode, Json<HookResponse>) {
    if !hook_secret_matches(&app_state.config, &headers) {
        warn!("Invalid event hook secret received");
        return HookResponse::reply(StatusCode::UNAUTHORIZED, "unauthorized");
    }
    if !has_id(&user) {
        return HookResponse::reply(StatusCode::UNPROCESSABLE_ENTITY, "missing _id");
    }

    app_state
        .event_publisher
        .publish(DomainEvent::UserRegistered { user })
        .await;
    HookResponse::reply(StatusCode::OK, "published")
}

/// POST announce a newly published announcement to every client
#[utoipa::path(
    post,
    path = "/events/announcements",
    request_body(content = Object, description = "The published announcement"),
    responses(
        (status = 200, description = "Published as `new-announcement`", body = HookResponse),
        (status = 401, description = "Missing or wrong hook secret", body = HookResponse)
    )
)]
pub async fn announcement_published(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(announcement): Json<Value>,
) -> (StatusCode, Json<HookResponse>) {
    if !hook_secret_matches(&app_state.config, &headers) {
        warn!("Invalid event hook secret received");
        return HookResponse::reply(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    app_state
        .event_publisher
        .publish(DomainEvent::AnnouncementPublished { announcement })
        .await;
    HookResponse::reply(StatusCode::OK, "published")
}

/// POST announce that a notification's read state or content changed
#[utoipa::path(
    post,
    path = "/events/notifications/{id}",
    params(
        ("id" = String, Path, description = "Upstream `_id` of the notification"),
    ),
    responses(
        (status = 200, description = "Published as `notification-updated`", body = HookResponse),
        (status = 401, description = "Missing or wrong hook secret", body = HookResponse)
    )
)]
pub async fn notification_state_changed(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(notification_id): Path<String>,
) -> (StatusCode, Json<HookResponse>) {
    if !hook_secret_matches(&app_state.config, &headers) {
        warn!("Invalid event hook secret received");
        return HookResponse::reply(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    app_state
        .event_publisher
        .publish(DomainEvent::NotificationStateChanged { notification_id })
        .await;
    HookResponse::reply(StatusCode::OK, "published")
}
