//! Pure core of the portal: who may see which page, and how live events are
//! folded into the collections a page renders.
//!
//! Nothing in this crate touches HTTP or a socket. The `web` crate renders
//! gate decisions as redirects and the `live` crate feeds pushed events into
//! the reconcilers defined here.

pub mod collection;
pub mod error;
pub mod gate;
pub mod notification;
pub mod pagination;
pub mod reconciler;
pub mod route;
pub mod session;
pub mod user;

pub use collection::{DomainCollection, Identified, Searchable, SharedCollection};
pub use gate::{AccessGate, Decision};
pub use notification::Notification;
pub use pagination::{PageView, PaginationState, ITEMS_PER_PAGE};
pub use reconciler::{Invalidate, Reconciliation, Refetch, RefetchWorker, ViewReconciler};
pub use route::{NavigationMatcher, RouteClass, RoutePolicy};
pub use session::{CredentialStore, MemoryCredentialStore, Role, Session};
pub use user::UserDetails;
