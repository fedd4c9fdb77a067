//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors are modeled as a tree with `domain::error::Error` as the root holding
/// an `error_kind` enum tree, plus the original error in `source`. Callers above
/// this layer (`web`, `live`) match on the kind tree to pick a status code or
/// decide whether to log and carry on, and never depend on the lower-level
/// error types directly.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Errors that originate inside this process.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Session(SessionErrorKind),
    /// The route table or another configured value is unusable.
    Config(String),
    Other(String),
}

/// Credential problems. None of these is ever surfaced as a crash; the
/// session simply reads as unauthenticated.
#[derive(Debug, PartialEq)]
pub enum SessionErrorKind {
    /// Token and role were not provided together.
    Invalid,
    /// Role tag is not one of the known roles.
    UnknownRole(String),
}

/// Errors that originate in a collaborator on the other side of the network.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// The live channel connection dropped or was refused.
    Connection,
    /// An authoritative refetch failed.
    Refetch,
    /// The collaborator answered with something we could not decode.
    InvalidResponse,
    Network,
    Other(String),
}

impl Error {
    pub fn invalid_session() -> Self {
        Self {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Session(
                SessionErrorKind::Invalid,
            )),
        }
    }

    pub fn unknown_role(tag: &str) -> Self {
        Self {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Session(
                SessionErrorKind::UnknownRole(tag.to_string()),
            )),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config(message.into())),
        }
    }

    /// The live channel connection dropped or could not be opened.
    pub fn connection(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: Some(source.into()),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Connection),
        }
    }

    /// Wraps a collaborator failure that happened while refetching.
    pub fn refetch(source: Error) -> Self {
        Self {
            source: Some(Box::new(source)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::Refetch),
        }
    }

    pub fn is_session_error(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Session(_))
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        } else if err.is_decode() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::InvalidResponse),
            }
        } else if err.is_connect() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Connection),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::External(ExternalErrorKind::InvalidResponse),
        }
    }
}
