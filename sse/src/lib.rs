//! Server-Sent Events (SSE) push hub for the portal's live channel.
//!
//! This crate keeps the registry of open live connections and routes named
//! push events to them.
//!
//! # Architecture
//!
//! - **Single connection per client**: each signed-in browser (or watch client)
//!   keeps one SSE connection open for the whole session, shared by every page.
//! - **Dual-index registry**: O(1) lookups for both connection management and
//!   role-scoped routing via separate DashMap indices.
//! - **Roles and Broadcast scopes**: messages go to connections of the given
//!   roles (admin-only tables) or to every connection.
//! - **Ephemeral messages**: nothing is replayed. A client that was offline
//!   sees fresh data on its next authoritative fetch.
//!
//! # Message Flow
//!
//! 1. Client opens `/sse` with its session cookies
//! 2. The web layer validates the session and registers the connection with its role
//! 3. An upstream hook publishes a `DomainEvent`
//! 4. `SseDomainEventHandler` converts it to a named `Event` and a `MessageScope`
//! 5. `Manager` serializes the payload and hands it to matching connections
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! use sse::message::{Event as SseEvent, Message as SseMessage, MessageScope};
//!
//! app_state.sse_manager.send_message(SseMessage {
//!     event: SseEvent::NewAnnouncement { announcement },
//!     scope: MessageScope::Broadcast,
//! });
//! ```
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture and type-safe ConnectionId
//! - `manager`: High-level message routing (delegates to ConnectionRegistry)
//! - `message`: Event names, payloads and scopes
//! - `domain_event_handler`: `events::EventHandler` that feeds the manager

pub mod connection;
pub mod domain_event_handler;
pub mod manager;
pub mod message;

pub use manager::Manager;
