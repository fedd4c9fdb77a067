use crate::controller::ApiResponse;
use crate::error::Result as WebResult;
use crate::extractors::credentials::CookieCredentialStore;
use crate::middleware::access_gate::GateState;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use domain::session::CredentialStore;
use log::*;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use utoipa::ToSchema;

/// The upstream sign-in response, forwarded as-is by the sign-in page.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignInParams {
    #[serde(default)]
    pub token: String,
    pub user: SignedInUser,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignedInUser {
    /// Role tag: `SUPER_ADMIN`, `ADMIN` or `USER`.
    #[serde(default)]
    pub roles: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionRedirect {
    /// Where the client should navigate next.
    pub redirect: String,
}

/// Stores the session in the `token` and `userType` cookies.
///
/// Both values are written together or not at all, e.g.:
/// set-cookie: token=eyJhbGciOi...; Path=/; Max-Age=86400; SameSite=Lax
/// set-cookie: userType=ADMIN; Path=/; Max-Age=86400; SameSite=Lax
#[utoipa::path(
    post,
    path = "/session",
    request_body = SignInParams,
    responses(
        (status = 200, description = "Session cookies written", body = SessionRedirect),
        (status = 422, description = "Token and role were not provided together, or the role is unknown")
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Extension(gate_state): Extension<GateState>,
    cookies: Cookies,
    Json(params): Json<SignInParams>,
) -> WebResult<impl IntoResponse> {
    let store = CookieCredentialStore::new(cookies, gate_state.secure_cookies());
    store.set(
        &params.token,
        &params.user.roles,
        app_state.config.session_ttl(),
    )?;

    let role = params.user.roles.parse().ok();
    let redirect = gate_state.policy().home_for(role).to_string();
    info!("Signed in a {} session", params.user.roles);

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        SessionRedirect { redirect },
    )))
}

/// Clears both session cookies.
#[utoipa::path(
    delete,
    path = "/session",
    responses(
        (status = 200, description = "Session cookies cleared")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn delete(
    Extension(gate_state): Extension<GateState>,
    cookies: Cookies,
) -> impl IntoResponse {
    CookieCredentialStore::new(cookies, gate_state.secure_cookies()).clear();
    debug!("Signed out");
    Json(ApiResponse::<()>::no_content(StatusCode::OK.into()))
}
