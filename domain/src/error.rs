//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the domain layer are modeled as a tree with `Error` as the root
/// holding a `source` for chaining and an `error_kind` tree describing what
/// went wrong. Lower-layer errors (`entity_api`) are translated into this
/// tree at the boundary so that `web` only ever matches on domain kinds when
/// choosing HTTP statuses and OAuth error bodies.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    Oauth(OauthErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Entity errors bubbling up from the storage layer, reduced to the subset
/// the domain layer cares about.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    Other(String),
}

/// Protocol-level failures of the authorization-session state machine.
/// These are expected request outcomes, not faults: `AuthorizationPending`
/// and `SlowDown` in particular are answers a correctly behaving device
/// receives on every poll until the user decides.
#[derive(Debug, PartialEq)]
pub enum OauthErrorKind {
    /// Unknown, suspended, or otherwise refused client application.
    InvalidClient,
    /// Redirect URI not on the application's trusted list.
    InvalidRedirect,
    SessionNotFound,
    SessionExpired,
    /// A consent decision conflicting with one already recorded.
    InvalidState,
    /// Bad or already-consumed code / device code / verifier. Deliberately
    /// indistinguishable between causes.
    InvalidGrant,
    /// Device flow: the user has not decided yet.
    AuthorizationPending,
    /// Device flow: polled again before the poll interval elapsed.
    SlowDown,
    /// The user declined consent.
    AccessDenied,
    UnsupportedGrantType,
    /// Malformed or missing request parameters.
    InvalidRequest,
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

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            _ => EntityErrorKind::Other("EntityApiErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JWT encoding related error".to_string(),
            )),
        }
    }
}

/// Helper to build a protocol error with no underlying source.
pub fn oauth_error(kind: OauthErrorKind) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Oauth(kind),
    }
}

/// Helper to build an internal error carrying only a message.
pub fn internal_error(message: &str) -> Error {
    Error {
        source: None,
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(message.to_string())),
    }
}

impl Error {
    /// Returns the protocol error kind, if this is a protocol-level failure.
    pub fn oauth_kind(&self) -> Option<&OauthErrorKind> {
        match &self.error_kind {
            DomainErrorKind::Oauth(kind) => Some(kind),
            DomainErrorKind::Internal(_) => None,
        }
    }
}
