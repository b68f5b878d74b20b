use uuid::Uuid;

pub mod prelude;

// Core entities
pub mod applications;
pub mod auth_sessions;
pub mod trusted_redirect_uris;

// Shared enums
pub mod flow_type;
pub mod session_status;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
