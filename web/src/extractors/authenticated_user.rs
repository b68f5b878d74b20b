use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use domain::access_token::{self, AccessTokenClaims};
use log::*;
use service::AppState;

/// The authenticated end user acting on a consent screen, extracted from a
/// `Bearer` token issued by the identity service's login subsystem and
/// signed with the broker's signing key.
pub(crate) struct AuthenticatedUser(pub AccessTokenClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))?;

        match access_token::validate(&state.config, token) {
            Ok(claims) => Ok(AuthenticatedUser(claims)),
            Err(e) => {
                debug!("Bearer token rejected: {e:?}");
                Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
            }
        }
    }
}
