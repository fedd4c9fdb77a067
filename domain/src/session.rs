//! Client-held session credentials: an opaque token plus a role tag.
//!
//! The two values are only meaningful together. [`Session`] enforces that on
//! construction, so the access gate never has to reason about a token without
//! a role (or the reverse).

use crate::error::Error;
use log::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Name of the cookie holding the opaque authentication token.
pub const TOKEN_COOKIE: &str = "token";
/// Name of the cookie holding the role tag.
pub const ROLE_COOKIE: &str = "userType";
/// Fixed lifetime of both cookies.
pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::SuperAdmin, Role::Admin, Role::User];

    /// Wire tag, as stored in the role cookie.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(Error::unknown_role(other)),
        }
    }
}

/// The credentials read for one navigation.
///
/// Either both token and role are present, or neither is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<(String, Role)>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(token: impl Into<String>, role: Role) -> Self {
        let token = token.into();
        if token.is_empty() {
            return Self::anonymous();
        }
        Self {
            credentials: Some((token, role)),
        }
    }

    /// Builds a session from raw stored values.
    ///
    /// Empty values count as absent. A token whose role is missing or not a
    /// known tag, and a role without a token, both read as anonymous.
    pub fn from_raw(token: Option<&str>, role: Option<&str>) -> Self {
        let token = token.filter(|t| !t.is_empty());
        let role = role.filter(|r| !r.is_empty());

        match (token, role) {
            (Some(token), Some(tag)) => match tag.parse::<Role>() {
                Ok(role) => Self::signed_in(token, role),
                Err(_) => {
                    debug!("Ignoring session with unknown role tag {tag:?}");
                    Self::anonymous()
                }
            },
            (Some(_), None) => {
                debug!("Ignoring session token stored without a role");
                Self::anonymous()
            }
            _ => Self::anonymous(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|(token, _)| token.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.credentials.as_ref().map(|(_, role)| *role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Checks a pair of values about to be written.
///
/// Returns `Ok(None)` when both are empty (equivalent to clearing),
/// `Ok(Some(..))` for a complete pair, and `InvalidSession` otherwise.
pub fn validate_credentials(token: &str, role: &str) -> Result<Option<(String, Role)>, Error> {
    match (token.is_empty(), role.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => Ok(Some((token.to_string(), role.parse::<Role>()?))),
        _ => Err(Error::invalid_session()),
    }
}

/// Narrow storage interface behind which the two session values live.
pub trait CredentialStore {
    fn get(&self) -> Session;

    /// Writes both values with the given time-to-live.
    fn set(&self, token: &str, role: &str, ttl: Duration) -> Result<(), Error>;

    fn clear(&self);
}

#[derive(Debug)]
struct StoredCredentials {
    token: String,
    role: Role,
    expires_at: Instant,
}

/// In-process credential store for one client context.
///
/// Clones share the same slot, so every page of a client sees the same session.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    slot: Arc<Mutex<Option<StoredCredentials>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Session {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(stored) if Instant::now() < stored.expires_at => {
                Session::signed_in(stored.token.clone(), stored.role)
            }
            Some(_) => {
                debug!("Stored session expired");
                *slot = None;
                Session::anonymous()
            }
            None => Session::anonymous(),
        }
    }

    fn set(&self, token: &str, role: &str, ttl: Duration) -> Result<(), Error> {
        let validated = validate_credentials(token, role)?;
        *self.slot.lock() = validated.map(|(token, role)| StoredCredentials {
            token,
            role,
            expires_at: Instant::now() + ttl,
        });
        Ok(())
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}
