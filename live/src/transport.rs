//! The single connection under the live channel.

use domain::error::Error;
use domain::session::{Session, ROLE_COOKIE, TOKEN_COOKIE};
use eventsource_client::{self as es, Client};
use futures_util::stream::{BoxStream, StreamExt};
use log::*;
use std::sync::Arc;
use std::time::Duration;

/// One named event as it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

/// Frames in arrival order.
///
/// An `Err` item reports a dropped or refused connection. The transport keeps
/// reconnecting on its own, so more frames may follow it. The stream only ends
/// when the transport gives up for good.
pub type FrameStream = BoxStream<'static, Result<Frame, Error>>;

pub trait Transport: Send + Sync + 'static {
    fn open(&self) -> FrameStream;
}

/// Reconnect schedule for the live connection: 1s, doubling, capped at 60s,
/// retried even when the very first connect fails.
pub fn reconnect_options() -> es::ReconnectOptions {
    es::ReconnectOptions::reconnect(true)
        .retry_initial(true)
        .delay(Duration::from_secs(1))
        .backoff_factor(2)
        .delay_max(Duration::from_secs(60))
        .build()
}

/// Server-sent events from `{base_url}/sse`, authenticated with the session cookies.
pub struct EventSourceTransport {
    client: Arc<dyn Client>,
}

impl EventSourceTransport {
    pub fn new(base_url: &str, session: &Session) -> Result<Self, Error> {
        let url = format!("{}/sse", base_url.trim_end_matches('/'));
        let mut builder =
            es::ClientBuilder::for_url(&url).map_err(|e| Error::connection(e.to_string()))?;

        if let (Some(token), Some(role)) = (session.token(), session.role()) {
            let cookie = format!("{TOKEN_COOKIE}={token}; {ROLE_COOKIE}={role}");
            builder = builder
                .header("Cookie", &cookie)
                .map_err(|e| Error::connection(e.to_string()))?;
        } else {
            warn!("Opening the live channel without a session; the server will refuse it");
        }

        let client = builder.reconnect(reconnect_options()).build();
        debug!("Live channel transport ready for {url}");

        Ok(Self {
            client: Arc::new(client),
        })
    }
}

impl Transport for EventSourceTransport {
    fn open(&self) -> FrameStream {
        self.client
            .stream()
            .filter_map(|item| async move {
                match item {
                    Ok(es::SSE::Event(event)) => Some(Ok(Frame {
                        event: event.event_type,
                        data: event.data,
                    })),
                    Ok(es::SSE::Comment(_)) => {
                        // Ignore comments (keep-alive)
                        None
                    }
                    #[allow(unreachable_patterns)]
                    Ok(_) => None,
                    Err(e) => Some(Err(Error::connection(e.to_string()))),
                }
            })
            .boxed()
    }
}
