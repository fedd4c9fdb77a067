use crate::extractors::credentials::CookieCredentialStore;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use domain::error::Error as DomainError;
use domain::gate::{AccessGate, Decision};
use domain::route::{NavigationMatcher, RoutePolicy};
use domain::session::CredentialStore;
use log::*;
use service::config::Config;
use std::sync::Arc;
use tower_cookies::Cookies;

/// Everything the gate needs per navigation, built once from config.
#[derive(Clone)]
pub struct GateState {
    gate: Arc<AccessGate>,
    matcher: Arc<NavigationMatcher>,
    secure_cookies: bool,
}

impl GateState {
    pub fn new(gate: AccessGate, matcher: NavigationMatcher, secure_cookies: bool) -> Self {
        Self {
            gate: Arc::new(gate),
            matcher: Arc::new(matcher),
            secure_cookies,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, DomainError> {
        let policy = RoutePolicy::from_config(config)?;
        Ok(Self::new(
            AccessGate::new(policy),
            NavigationMatcher::from_config(config),
            config.is_production(),
        ))
    }

    pub fn policy(&self) -> &RoutePolicy {
        self.gate.policy()
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Runs the access gate for every navigation the matcher selects.
///
/// Paths outside the matcher pass straight through. A redirect decision is
/// rendered as `307 Temporary Redirect` so the browser repeats the method.
pub async fn access_gate(
    State(gate_state): State<GateState>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !gate_state.matcher.matches(&path) {
        return next.run(request).await;
    }

    let session = CookieCredentialStore::new(cookies, gate_state.secure_cookies).get();
    match gate_state.gate.evaluate(&session, &path) {
        Decision::Allow => next.run(request).await,
        Decision::Redirect(location) => {
            debug!("Redirecting {path} to {location}");
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;

    async fn page() -> &'static str {
        "page"
    }

    fn app() -> Router {
        let gate_state = GateState::from_config(&Config::default()).unwrap();
        Router::new()
            .route("/", get(page))
            .route("/signin", get(page))
            .route("/admin/dashboard", get(page))
            .route("/protein-search", get(page))
            .layer(from_fn_with_state(gate_state, access_gate))
            .layer(CookieManagerLayer::new())
    }

    async fn navigate(path: &str, cookie: Option<&str>) -> (StatusCode, Option<String>) {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|value| value.to_str().unwrap().to_string());
        (response.status(), location)
    }

    #[tokio::test]
    async fn signed_in_user_is_sent_from_signin_to_search() {
        let (status, location) = navigate("/signin", Some("token=t1; userType=USER")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/protein-search"));
    }

    #[tokio::test]
    async fn anonymous_client_is_sent_to_signin() {
        let (status, location) = navigate("/admin/dashboard", None).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/signin"));
    }

    #[tokio::test]
    async fn user_role_is_sent_home_from_admin() {
        let (status, location) =
            navigate("/admin/dashboard", Some("token=t1; userType=USER")).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/protein-search"));
    }

    #[tokio::test]
    async fn admin_reaches_the_dashboard() {
        let (status, location) =
            navigate("/admin/dashboard", Some("token=t1; userType=ADMIN")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(location, None);
    }

    #[tokio::test]
    async fn unknown_role_cookie_reads_as_signed_out() {
        let (status, _) = navigate("/signin", Some("token=t1; userType=OWNER")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn paths_outside_the_matcher_bypass_the_gate() {
        let (status, location) = navigate("/protein-search", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(location, None);
    }
}
