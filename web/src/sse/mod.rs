//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the live channel endpoint.
//! The push hub itself (Manager, ConnectionRegistry, Message types) lives in
//! the `sse` crate so `service` can wire it without depending on `web`.

pub mod handler;
