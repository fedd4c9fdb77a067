//! Client half of the portal's live updates.
//!
//! A [`LiveChannel`] holds the one connection to the portal's `/sse` endpoint
//! and dispatches named events to subscribers. [`feeds`] binds those names to
//! the reconcilers of the users and notifications collections, and
//! [`api_client`] provides the authoritative refetches the reconcilers fall
//! back to.

pub mod api_client;
pub mod channel;
pub mod feeds;
pub mod transport;

pub use channel::{LiveChannel, PageSubscriptions, Subscription};
pub use transport::{EventSourceTransport, Frame, Transport};
