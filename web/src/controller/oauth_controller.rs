//! Controller for the OAuth2-facing endpoints: the browser authorization
//! entry point, device authorization, the token endpoint and the discovery
//! document.
//!
//! Note: `/oauth2/authorize` works via a browser redirect and cannot carry
//! custom headers; its failures are returned as plain RFC error bodies and
//! never as a redirect to an unvalidated target.

use crate::params::oauth::{AuthorizeParams, DeviceCodeParams, TokenParams};
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::{Form, Json};

use domain::access_token::Credential;
use domain::authorization_session;
use domain::error::{oauth_error, OauthErrorKind};
use log::*;
use serde::Serialize;
use serde_json::json;

const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Response body of the device authorization endpoint (RFC 8628 §3.2)
#[derive(Debug, Serialize)]
pub(crate) struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    verification_uri_complete: String,
    expires_in: i64,
    interval: i32,
}

/// Successful token response (RFC 6749 §5.1)
#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
}

impl From<Credential> for TokenResponse {
    fn from(credential: Credential) -> Self {
        Self {
            access_token: credential.access_token,
            token_type: credential.token_type,
            expires_in: credential.expires_in,
        }
    }
}

/// GET /oauth2/authorize
///
/// Browser entry point of the authorization code flow. Creates a pending
/// session and redirects the user agent to the consent UI. The redirect URI
/// is validated against the application's trusted list before any session
/// exists; an untrusted URI gets a plain 400, never a redirect.
#[utoipa::path(
    get,
    path = "/oauth2/authorize",
    params(
        ("response_type" = String, Query, description = "Must be `code`"),
        ("client_id" = String, Query, description = "Registered application id"),
        ("redirect_uri" = String, Query, description = "Exact registered redirect target"),
        ("state" = Option<String>, Query, description = "Opaque client value echoed on the redirect"),
        ("code_challenge" = String, Query, description = "PKCE S256 challenge"),
        ("code_challenge_method" = String, Query, description = "Must be `S256`"),
    ),
    responses(
        (status = 302, description = "Redirect to the consent UI"),
        (status = 400, description = "Unsupported response type, bad PKCE parameters, or untrusted redirect URI"),
        (status = 401, description = "Unknown or suspended client"),
    )
)]
pub async fn authorize(
    State(app_state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Result<impl IntoResponse, Error> {
    if params.response_type.as_deref() != Some("code") {
        return Err(oauth_error(OauthErrorKind::InvalidRequest).into());
    }

    let session = authorization_session::initiate_auth_code(
        app_state.db_conn_ref(),
        &app_state.config,
        authorization_session::InitiateAuthCodeParams {
            client_id: params.client_id,
            redirect_uri: params.redirect_uri,
            state: params.state,
            code_challenge: params.code_challenge.unwrap_or_default(),
            code_challenge_method: params.code_challenge_method.unwrap_or_default(),
        },
    )
    .await?;

    let target = authorization_session::login_url(&app_state.config, session.id);
    Ok(Redirect::temporary(&target))
}

/// POST /oauth2/devicecode
///
/// Opens a device-code session for an input-constrained device. The device
/// shows `user_code` (or `verification_uri_complete`) to the user and polls
/// the token endpoint with `device_code` at `interval` seconds.
#[utoipa::path(
    post,
    path = "/oauth2/devicecode",
    responses(
        (status = 200, description = "Device authorization created"),
        (status = 401, description = "Unknown, suspended, or device-flow-disabled client"),
    )
)]
pub async fn devicecode(
    State(app_state): State<AppState>,
    Form(params): Form<DeviceCodeParams>,
) -> Result<impl IntoResponse, Error> {
    let config = &app_state.config;
    let session = authorization_session::initiate_device_code(
        app_state.db_conn_ref(),
        config,
        &params.client_id,
    )
    .await?;

    let user_code = session
        .user_code
        .ok_or_else(|| domain::error::internal_error("Device session has no user code"))?;

    let response = DeviceCodeResponse {
        device_code: session
            .device_code
            .ok_or_else(|| domain::error::internal_error("Device session has no device code"))?,
        verification_uri: authorization_session::verification_uri(config),
        verification_uri_complete: authorization_session::verification_uri_complete(
            config, &user_code,
        ),
        user_code,
        expires_in: config.session_expiry_secs,
        interval: session
            .poll_interval_secs
            .unwrap_or(config.device_poll_interval_secs),
    };

    Ok(Json(response))
}

/// POST /oauth2/token
///
/// One-shot redemption of a completed session. Dispatches on `grant_type`;
/// the device-code branch doubles as the polling endpoint, answering
/// `authorization_pending` and `slow_down` until the user decides.
#[utoipa::path(
    post,
    path = "/oauth2/token",
    responses(
        (status = 200, description = "Access token issued"),
        (status = 400, description = "invalid_grant, authorization_pending, slow_down, expired_token, access_denied, or unsupported_grant_type"),
    )
)]
pub async fn token(
    State(app_state): State<AppState>,
    Form(params): Form<TokenParams>,
) -> Result<Json<TokenResponse>, Error> {
    let db = app_state.db_conn_ref();
    let config = &app_state.config;

    let credential = match params.grant_type.as_str() {
        "authorization_code" => {
            let code = params
                .code
                .filter(|c| !c.is_empty())
                .ok_or_else(|| oauth_error(OauthErrorKind::InvalidRequest))?;
            let verifier = params
                .code_verifier
                .filter(|v| !v.is_empty())
                .ok_or_else(|| oauth_error(OauthErrorKind::InvalidRequest))?;

            authorization_session::redeem_auth_code(db, config, &code, &verifier, &params.client_id)
                .await?
        }
        DEVICE_CODE_GRANT_TYPE => {
            let device_code = params
                .device_code
                .filter(|c| !c.is_empty())
                .ok_or_else(|| oauth_error(OauthErrorKind::InvalidRequest))?;

            authorization_session::redeem_device_code(db, config, &device_code, &params.client_id)
                .await?
        }
        other => {
            debug!("Unsupported grant_type: {other}");
            return Err(oauth_error(OauthErrorKind::UnsupportedGrantType).into());
        }
    };

    Ok(Json(credential.into()))
}

/// GET /.well-known/openid-configuration
///
/// Static discovery document for the subset of OAuth2 this broker speaks.
#[utoipa::path(
    get,
    path = "/.well-known/openid-configuration",
    responses((status = 200, description = "Provider metadata"))
)]
pub async fn discovery(State(app_state): State<AppState>) -> impl IntoResponse {
    let base = app_state.config.issuer.trim_end_matches('/').to_string();

    Json(json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/oauth2/authorize"),
        "token_endpoint": format!("{base}/oauth2/token"),
        "device_authorization_endpoint": format!("{base}/oauth2/devicecode"),
        "response_types_supported": ["code"],
        "grant_types_supported": [
            "authorization_code",
            DEVICE_CODE_GRANT_TYPE,
        ],
        "code_challenge_methods_supported": ["S256"],
        "token_endpoint_auth_methods_supported": ["none"],
    }))
}
