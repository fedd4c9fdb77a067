use crate::controller::{event_controller, health_check_controller, session_controller};
use crate::middleware::access_gate::{access_gate, GateState};
use crate::sse::handler::sse_handler;
use crate::AppState;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Router,
};
use log::*;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Portal API"
        ),
        paths(
            health_check_controller::health_check,
            session_controller::create,
            session_controller::delete,
            event_controller::user_registered,
            event_controller::announcement_published,
            event_controller::notification_state_changed,
        ),
        components(
            schemas(
                session_controller::SignInParams,
                session_controller::SignedInUser,
                session_controller::SessionRedirect,
                event_controller::HookResponse,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "portal_rs", description = "Session gating and live updates for the admin portal")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines the cookie based session requirement for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "token",
                    "Session token written by POST /session, sent together with the userType cookie",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState, gate_state: GateState) -> Router {
    let cors = cors_layer(&app_state);
    Router::new()
        .merge(health_routes())
        .merge(session_routes(app_state.clone(), gate_state.clone()))
        .merge(sse_routes(app_state.clone()))
        .merge(event_routes(app_state.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/api-docs"))
        .fallback_service(page_routes(&app_state, gate_state))
        .layer(cors)
        .layer(CookieManagerLayer::new())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn session_routes(app_state: AppState, gate_state: GateState) -> Router {
    Router::new()
        .route(
            "/session",
            post(session_controller::create).delete(session_controller::delete),
        )
        .layer(Extension(gate_state))
        .with_state(app_state)
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .with_state(app_state)
}

fn event_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/events/users", post(event_controller::user_registered))
        .route(
            "/events/announcements",
            post(event_controller::announcement_published),
        )
        .route(
            "/events/notifications/{id}",
            post(event_controller::notification_state_changed),
        )
        .with_state(app_state)
}

/// The built page tree, served behind the access gate.
fn page_routes(app_state: &AppState, gate_state: GateState) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(&app_state.config.static_dir))
        .layer(from_fn_with_state(gate_state, access_gate))
}

fn cors_layer(app_state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid allowed origin {origin:?}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(event_controller::HOOK_SECRET_HEADER),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use service::config::Config;
    use std::convert::Infallible;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn app_with(config: Config) -> (Router, AppState) {
        let app_state = AppState::new(config);
        let gate_state = GateState::from_config(&app_state.config).unwrap();
        (define_routes(app_state.clone(), gate_state), app_state)
    }

    fn app() -> (Router, AppState) {
        app_with(Config::default())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookies(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_check_responds() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn sign_in_writes_both_cookies_and_returns_the_home_page() {
        let (app, _) = app();
        let response = app
            .oneshot(post_json(
                "/session",
                json!({"token": "t1", "user": {"roles": "ADMIN"}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("token=t1")));
        assert!(cookies.iter().any(|c| c.starts_with("userType=ADMIN")));
        assert!(cookies.iter().all(|c| c.contains("Max-Age=86400")));

        let body = body_json(response).await;
        assert_eq!(body["data"]["redirect"], "/admin/dashboard");
    }

    #[tokio::test]
    async fn oversized_session_expiry_keeps_a_positive_max_age() {
        let mut config = Config::default();
        config.session_expiry_seconds = u64::MAX;
        let (app, _) = app_with(config);
        let response = app
            .oneshot(post_json(
                "/session",
                json!({"token": "t1", "user": {"roles": "USER"}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies
            .iter()
            .all(|c| c.contains(&format!("Max-Age={}", i64::MAX))));
    }

    #[tokio::test]
    async fn half_written_session_is_rejected() {
        let (app, _) = app();
        let response = app
            .oneshot(post_json("/session", json!({"token": "t1", "user": {"roles": ""}})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn sign_out_expires_both_cookies() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/session")
                    .header(header::COOKIE, "token=t1; userType=USER")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert!(cookies.iter().any(|c| c.starts_with("token=")));
        assert!(cookies.iter().any(|c| c.starts_with("userType=")));
    }

    #[tokio::test]
    async fn pages_are_gated() {
        let (app, _) = app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/signin");
    }

    #[tokio::test]
    async fn new_user_hook_reaches_admin_connections_only() {
        let (app, app_state) = app();
        let (admin_tx, mut admin_rx) = mpsc::unbounded_channel::<Result<_, Infallible>>();
        let (user_tx, mut user_rx) = mpsc::unbounded_channel::<Result<_, Infallible>>();
        app_state
            .sse_manager
            .register_connection("ADMIN".to_string(), admin_tx);
        app_state
            .sse_manager
            .register_connection("USER".to_string(), user_tx);

        let response = app
            .oneshot(post_json("/events/users", json!({"_id": "u42"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(admin_rx.try_recv().is_ok());
        assert!(user_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn new_user_hook_requires_an_id() {
        let (app, _) = app();
        let response = app
            .oneshot(post_json("/events/users", json!({"name": "nobody"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn hooks_check_the_configured_secret() {
        let (app, _) = app_with(Config::default().set_event_hook_secret("s3cret".to_string()));

        let rejected = app
            .clone()
            .oneshot(post_json("/events/announcements", json!({"_id": "n1"})))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/events/notifications/n1")
            .header(event_controller::HOOK_SECRET_HEADER, "s3cret")
            .body(Body::empty())
            .unwrap();
        let accepted = app.oneshot(request).await.unwrap();
        assert_eq!(accepted.status(), StatusCode::OK);
    }
}
