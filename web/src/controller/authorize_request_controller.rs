//! Controller for the consent-UI-facing endpoints: session views and the
//! consent decision itself. All three require an authenticated user; the
//! identity arrives as a bearer token from the login subsystem.

use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::authorize_request::{ConsentParams, SessionQuery, UserCodeQuery};
use crate::{AppState, Error};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::authorization_session;
use log::*;
use serde_json::json;

/// GET /authorize/request
///
/// Read-only session view for the consent screen: which app is asking,
/// what state the session is in, and when it expires.
#[utoipa::path(
    get,
    path = "/authorize/request",
    params(
        ("session_id" = String, Query, description = "Authorization session id"),
    ),
    responses(
        (status = 200, description = "Session view"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown session"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn read(
    AuthenticatedUser(_claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Query(params): Query<SessionQuery>,
) -> Result<impl IntoResponse, Error> {
    let view =
        authorization_session::get_status(app_state.db_conn_ref(), params.session_id).await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), view)))
}

/// GET /authorize/request/by-user-code
///
/// Resolves a pending device session from the human-typed code, for the
/// device flow's "enter code" step. Settled sessions do not resolve.
#[utoipa::path(
    get,
    path = "/authorize/request/by-user-code",
    params(
        ("user_code" = String, Query, description = "Human-typed device code, case-insensitive"),
    ),
    responses(
        (status = 200, description = "Session view"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No pending session with this code"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn read_by_user_code(
    AuthenticatedUser(_claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Query(params): Query<UserCodeQuery>,
) -> Result<impl IntoResponse, Error> {
    let view =
        authorization_session::get_status_by_user_code(app_state.db_conn_ref(), &params.user_code)
            .await?;
    Ok(Json(ApiResponse::new(StatusCode::OK.into(), view)))
}

/// POST /authorize/request/consent
///
/// Records the authenticated user's approve/deny decision. For auth-code
/// sessions the response carries the client redirect (with `code` and
/// `state`, or `error=access_denied`) for the consent UI to follow.
#[utoipa::path(
    post,
    path = "/authorize/request/consent",
    responses(
        (status = 200, description = "Decision recorded (idempotent for replays of the same decision)"),
        (status = 400, description = "Session expired"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "A conflicting decision was already recorded"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn consent(
    AuthenticatedUser(claims): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(params): Json<ConsentParams>,
) -> Result<impl IntoResponse, Error> {
    debug!(
        "Consent decision approve={} on session {} by user {}",
        params.approve, params.session_id, claims.sub
    );

    let decision = authorization_session::decide(
        app_state.db_conn_ref(),
        params.session_id,
        claims.sub,
        params.approve,
    )
    .await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({
            "status": decision.status,
            "redirect_url": decision.redirect_url,
        }),
    )))
}
