use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use domain::application;
use log::*;
use service::AppState;

static X_API_KEY: &str = "x-api-key";

/// The client application behind a server-to-server request, resolved from
/// the `X-Api-Key` header by SHA-256 digest. Suspended applications are
/// rejected here, before any handler runs.
pub(crate) struct ApiKeyApplication(pub domain::applications::Model);

#[async_trait]
impl FromRequestParts<AppState> for ApiKeyApplication {
    type Rejection = RejectionType;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(X_API_KEY)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing API key".to_string()))?;

        match application::resolve_by_api_key(state.db_conn_ref(), api_key).await {
            Ok(app) => Ok(ApiKeyApplication(app)),
            Err(e) => {
                warn!("API key rejected: {e:?}");
                Err((StatusCode::UNAUTHORIZED, "Invalid API key".to_string()))
            }
        }
    }
}
