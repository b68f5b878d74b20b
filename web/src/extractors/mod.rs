pub(crate) mod api_key;
pub(crate) mod authenticated_user;

use axum::http::StatusCode;

type RejectionType = (StatusCode, String);
