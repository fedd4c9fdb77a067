use log::*;
use service::{config::Config, logging::Logger, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting portal_rs [{:?}], serving pages from {}",
        config.runtime_env(),
        config.static_dir
    );
    if config.event_hook_secret().is_none() {
        warn!("EVENT_HOOK_SECRET is not set; event hooks accept any caller");
    }

    let app_state = AppState::new(config);

    if let Err(e) = web::init_server(app_state).await {
        error!("Portal server stopped: {e}");
        std::process::exit(1);
    }
}
