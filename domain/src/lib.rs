//! Business logic of the authorization-session broker: the session state
//! machine, the two grant flows, consent handling, and credential minting.
//! The `web` layer depends on this crate and never on `entity_api` directly.

// Re-exports from the `entity` crate via `entity_api`, so that consumers of
// `domain` do not need to depend on the lower layers themselves.
pub use entity_api::{
    applications, auth_sessions, flow_type, session_status, trusted_redirect_uris, Id,
};

pub mod access_token;
pub mod application;
pub mod authorization_session;
pub mod error;
pub mod pkce;
pub mod redirect;
pub mod sweep;
pub mod user_code;
