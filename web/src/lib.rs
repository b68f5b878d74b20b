//! HTTP surface of the authorization-session broker: controllers, params,
//! extractors and the router. Everything protocol-shaped lives in `domain`;
//! this crate only translates between HTTP and domain calls.

pub use error::{Error, Result};
pub use service::AppState;

pub(crate) mod controller;
pub mod error;
pub(crate) mod extractors;
pub(crate) mod params;
pub mod router;
