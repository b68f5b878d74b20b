pub use entity::{applications, auth_sessions, flow_type, session_status, trusted_redirect_uris, Id};

pub mod application;
pub mod auth_session;
pub mod error;

pub(crate) fn uuid_parse_str(uuid_str: &str) -> Result<Id, error::Error> {
    Id::parse_str(uuid_str).map_err(|_| error::Error {
        source: None,
        error_kind: error::EntityApiErrorKind::InvalidQueryTerm,
    })
}
