use config::Config;
use events::EventPublisher;
use sse::domain_event_handler::SseDomainEventHandler;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<sse::Manager>,
    pub event_publisher: EventPublisher,
}

impl AppState {
    /// Builds state with a fresh push hub and a publisher that feeds it.
    pub fn new(app_config: Config) -> Self {
        let sse_manager = Arc::new(sse::Manager::new());
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(sse_manager.clone())));

        Self {
            config: app_config,
            sse_manager,
            event_publisher,
        }
    }
}
