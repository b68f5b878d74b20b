//! Controller for server-to-server SSO initiation.
//!
//! A client backend authenticates with its API key and receives a fresh
//! session: the login URL goes into the user's browser, the device code is
//! what the backend itself polls the token endpoint with until the user
//! approves.

use crate::controller::ApiResponse;
use crate::extractors::api_key::ApiKeyApplication;
use crate::{AppState, Error};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::authorization_session;
use log::*;
use serde_json::json;

/// POST /sso/init
#[utoipa::path(
    post,
    path = "/sso/init",
    responses(
        (status = 200, description = "Session created; poll the token endpoint with the device code"),
        (status = 401, description = "Missing, invalid, or suspended API key"),
    ),
    security(("api_key" = []))
)]
pub async fn init(
    ApiKeyApplication(app): ApiKeyApplication,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let config = &app_state.config;
    let session =
        authorization_session::initiate_sso(app_state.db_conn_ref(), config, &app).await?;

    info!("SSO session {} initiated for application {}", session.id, app.id);

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({
            "session_id": session.id,
            "login_url": authorization_session::login_url(config, session.id),
            "device_code": session.device_code,
            "expires_in": config.session_expiry_secs,
            "interval": session.poll_interval_secs,
        }),
    )))
}
