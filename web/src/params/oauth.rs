use serde::Deserialize;
use utoipa::ToSchema;

/// Query parameters of the browser-facing authorization endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct AuthorizeParams {
    pub(crate) response_type: Option<String>,
    pub(crate) client_id: String,
    pub(crate) redirect_uri: String,
    pub(crate) state: Option<String>,
    pub(crate) code_challenge: Option<String>,
    pub(crate) code_challenge_method: Option<String>,
}

/// Form body of the device authorization endpoint
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct DeviceCodeParams {
    pub(crate) client_id: String,
}

/// Form body of the token endpoint, covering both grant types.
/// Which optional fields are required depends on `grant_type`.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct TokenParams {
    pub(crate) grant_type: String,
    pub(crate) client_id: String,
    pub(crate) code: Option<String>,
    pub(crate) code_verifier: Option<String>,
    pub(crate) device_code: Option<String>,
}
