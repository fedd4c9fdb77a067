use crate::extractors::credentials::CookieCredentialStore;
use async_stream::stream;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use domain::session::CredentialStore;
use log::*;
use service::AppState;
use ::sse::connection::ConnectionId;
use ::sse::Manager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_cookies::Cookies;

/// Unregisters a live connection when its response stream is dropped.
/// axum drops the stream when the client hangs up, and the receiver never
/// closes on its own because the manager holds the sender.
struct ConnectionGuard {
    manager: Arc<Manager>,
    connection_id: ConnectionId,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!("Live connection {} closed, cleaning up", self.connection_id.as_str());
        self.manager.unregister_connection(&self.connection_id);
    }
}

/// SSE handler that establishes the long-lived live channel connection.
/// One connection per signed-in client, open for as long as the client keeps it.
/// The connection is indexed by the session's role so role-scoped events
/// (new users for admin dashboards) only reach the right clients.
pub(crate) async fn sse_handler(State(app_state): State<AppState>, cookies: Cookies) -> Response {
    let session = CookieCredentialStore::new(cookies, app_state.config.is_production()).get();
    let Some(role) = session.role() else {
        debug!("Refusing live connection without a session");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };

    let (tx, mut rx) = mpsc::unbounded_channel();

    let connection_id = app_state
        .sse_manager
        .register_connection(role.as_str().to_string(), tx);

    let guard = ConnectionGuard {
        manager: app_state.sse_manager.clone(),
        connection_id,
    };

    // The channel sends Result<Event, Infallible>, so we just pass them through
    let stream = stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            yield event;
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
