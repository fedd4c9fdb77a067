//! Names of the events pushed over the live channel.
//!
//! The server tags each pushed event with one of these and clients subscribe
//! by the same names.

/// A user registered. The payload is the whole user record.
pub const NEW_USER: &str = "new-user";
/// An announcement was published. Notification lists are stale.
pub const NEW_ANNOUNCEMENT: &str = "new-announcement";
/// A notification's read state changed. Notification lists are stale.
pub const NOTIFICATION_UPDATED: &str = "notification-updated";
