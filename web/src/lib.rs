//! HTTP surface of the portal: the access gate in front of the page tree,
//! session cookies, event hooks and the live channel endpoint.

use log::*;
pub use service::AppState;
use tokio::net::TcpListener;

pub use self::error::{Error, Result};
pub use self::middleware::access_gate::GateState;

mod controller;
mod error;
mod extractors;
mod middleware;
pub mod router;
mod sse;

/// Builds the router from `app_state` and serves it until the process stops.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let gate_state = GateState::from_config(&app_state.config).map_err(std::io::Error::other)?;
    let listen_address = app_state.config.listen_address();

    let router = router::define_routes(app_state, gate_state);

    let listener = TcpListener::bind(&listen_address).await?;
    info!("Portal server listening on {listen_address}");

    axum::serve(listener, router).await
}
