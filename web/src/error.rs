use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, InternalErrorKind, OauthErrorKind,
};

extern crate log;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

/// RFC 6749 §5.2 / RFC 8628 §3.5 error body. Clients dispatch on `error`;
/// `error_description` is purely informational.
#[derive(Debug, Serialize)]
pub struct OauthErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<&'static str>,
}

/// The wire `error` code and HTTP status for each protocol error kind.
fn oauth_error_parts(kind: &OauthErrorKind) -> (StatusCode, &'static str) {
    match kind {
        OauthErrorKind::InvalidClient => (StatusCode::UNAUTHORIZED, "invalid_client"),
        OauthErrorKind::InvalidRedirect => (StatusCode::BAD_REQUEST, "invalid_redirect_uri"),
        OauthErrorKind::SessionNotFound => (StatusCode::NOT_FOUND, "session_not_found"),
        OauthErrorKind::SessionExpired => (StatusCode::BAD_REQUEST, "expired_token"),
        OauthErrorKind::InvalidState => (StatusCode::CONFLICT, "invalid_state"),
        OauthErrorKind::InvalidGrant => (StatusCode::BAD_REQUEST, "invalid_grant"),
        OauthErrorKind::AuthorizationPending => (StatusCode::BAD_REQUEST, "authorization_pending"),
        OauthErrorKind::SlowDown => (StatusCode::BAD_REQUEST, "slow_down"),
        OauthErrorKind::AccessDenied => (StatusCode::BAD_REQUEST, "access_denied"),
        OauthErrorKind::UnsupportedGrantType => {
            (StatusCode::BAD_REQUEST, "unsupported_grant_type")
        }
        OauthErrorKind::InvalidRequest => (StatusCode::BAD_REQUEST, "invalid_request"),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            DomainErrorKind::Oauth(oauth_error_kind) => {
                let (status, error) = oauth_error_parts(&oauth_error_kind);
                let body = OauthErrorBody {
                    error,
                    error_description: None,
                };
                (status, Json(body)).into_response()
            }
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => {
                        (StatusCode::NOT_FOUND, "NOT FOUND").into_response()
                    }
                    EntityErrorKind::Invalid => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
                    }
                    EntityErrorKind::Other(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                    }
                },
                InternalErrorKind::Config | InternalErrorKind::Other(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use domain::error::oauth_error;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn slow_down_maps_to_its_rfc_body() {
        let response = Error::from(oauth_error(OauthErrorKind::SlowDown)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "slow_down"})
        );
    }

    #[tokio::test]
    async fn invalid_client_is_unauthorized() {
        let response = Error::from(oauth_error(OauthErrorKind::InvalidClient)).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_not_found_is_404() {
        let response = Error::from(oauth_error(OauthErrorKind::SessionNotFound)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "session_not_found"})
        );
    }

    #[tokio::test]
    async fn internal_errors_stay_generic() {
        let response = Error::from(domain::error::internal_error("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
