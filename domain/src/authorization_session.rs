//! The authorization-session state machine.
//!
//! Sessions move `pending -> {authorized|denied} -> consumed`, with
//! `expired` reachable from any non-consumed state once the deadline
//! passes. Expiry is resolved lazily on every read and write, so no clock
//! tick has to land exactly on `expires_at`.
//!
//! Every transition is a store-level conditional update keyed on the
//! current status (see `entity_api::auth_session`), which serializes
//! concurrent writers per session: of N concurrent redemption attempts for
//! one authorized session, exactly one observes the `authorized ->
//! consumed` flip and receives a credential.

use crate::access_token::{self, Credential};
use crate::application;
use crate::error::{internal_error, oauth_error, Error, OauthErrorKind};
use crate::pkce;
use crate::user_code;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use entity::auth_sessions::Model;
use entity::flow_type::FlowType;
use entity::session_status::SessionStatus;
use entity::Id;
use entity_api::auth_session;
use log::{debug, info, warn};
use rand::Rng;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use service::config::Config;

/// Parameters of an authorization-code initiation request.
#[derive(Debug, Clone)]
pub struct InitiateAuthCodeParams {
    pub client_id: String,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

/// Read-only view of a session, shaped for the consent UI: enough to render
/// "App X wants to sign you in" and nothing a poller could abuse.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Id,
    pub app_id: Id,
    pub app_name: String,
    pub logo_url: Option<String>,
    pub flow: FlowType,
    pub status: SessionStatus,
    pub expires_at: DateTimeWithTimeZone,
}

/// Outcome of a consent decision, including the client redirect for
/// auth-code sessions.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub status: SessionStatus,
    /// Where the consent UI should send the browser next; only set for
    /// auth-code sessions.
    pub redirect_url: Option<String>,
}

/// Opaque single-use code: 32 random bytes, base64url. Used for both
/// authorization codes and device codes.
fn opaque_code() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

fn is_overdue(session: &Model, now: chrono::DateTime<chrono::Utc>) -> bool {
    session.expires_at < now
}

fn expiry_deadline(config: &Config, now: chrono::DateTime<chrono::Utc>) -> DateTimeWithTimeZone {
    (now + chrono::Duration::seconds(config.session_expiry_secs)).into()
}

/// Appends query parameters to a redirect URI that may already carry a query.
fn append_query(uri: &str, pairs: &[(&str, &str)]) -> String {
    let mut target = uri.to_string();
    for (i, (key, value)) in pairs.iter().enumerate() {
        let sep = if i == 0 {
            if uri.contains('?') {
                '&'
            } else {
                '?'
            }
        } else {
            '&'
        };
        target.push(sep);
        target.push_str(key);
        target.push('=');
        target.push_str(&urlencoding::encode(value));
    }
    target
}

/// The consent UI URL for a session, handed to client backends and browsers.
pub fn login_url(config: &Config, session_id: Id) -> String {
    format!(
        "{}/authorize?session_id={}",
        config.frontend_base_url.trim_end_matches('/'),
        session_id
    )
}

/// Where a device-flow user goes to type their code.
pub fn verification_uri(config: &Config) -> String {
    format!(
        "{}/activate",
        config.frontend_base_url.trim_end_matches('/')
    )
}

/// `verification_uri` with the user code pre-filled.
pub fn verification_uri_complete(config: &Config, user_code: &str) -> String {
    format!(
        "{}/activate?user_code={}",
        config.frontend_base_url.trim_end_matches('/'),
        user_code
    )
}

/// Creates a pending auth-code session after validating the client, the
/// redirect target and the PKCE parameters. Nothing is written when any
/// validation fails, so an untrusted callback never produces a session row.
pub async fn initiate_auth_code(
    db: &DatabaseConnection,
    config: &Config,
    params: InitiateAuthCodeParams,
) -> Result<Model, Error> {
    let app = application::resolve_str(db, &params.client_id).await?;

    if params.code_challenge_method != pkce::METHOD_S256 {
        debug!(
            "Rejecting code_challenge_method {:?} for application {}",
            params.code_challenge_method, app.id
        );
        return Err(oauth_error(OauthErrorKind::InvalidRequest));
    }
    if params.code_challenge.is_empty() {
        return Err(oauth_error(OauthErrorKind::InvalidRequest));
    }

    crate::redirect::validate(db, app.id, &params.redirect_uri).await?;

    let now = chrono::Utc::now();
    let model = Model {
        id: Id::new_v4(),
        application_id: app.id,
        flow: FlowType::AuthCode,
        status: SessionStatus::Pending,
        user_id: None,
        redirect_uri: Some(params.redirect_uri),
        code_challenge: Some(params.code_challenge),
        code_challenge_method: Some(pkce::METHOD_S256.to_string()),
        authorization_code: None,
        state: params.state,
        device_code: None,
        user_code: None,
        poll_interval_secs: None,
        last_polled_at: None,
        created_at: now.into(),
        expires_at: expiry_deadline(config, now),
    };

    let session = auth_session::create(db, model).await?;
    info!(
        "Initiated auth-code session {} for application {}",
        session.id, app.id
    );
    Ok(session)
}

/// Creates a pending device-code session for an input-constrained device.
/// Requires the application to have the device flow enabled.
pub async fn initiate_device_code(
    db: &DatabaseConnection,
    config: &Config,
    client_id: &str,
) -> Result<Model, Error> {
    let app = application::resolve_str(db, client_id).await?;

    if !app.device_code_enabled {
        debug!("Device flow disabled for application {}", app.id);
        return Err(oauth_error(OauthErrorKind::InvalidClient));
    }

    create_device_session(db, config, app.id).await
}

/// Creates a device-flow session on behalf of an API-key-authenticated
/// client backend. The returned session's device code is what the backend
/// polls the token endpoint with; the login URL carries the session id to
/// the consent UI.
pub async fn initiate_sso(
    db: &DatabaseConnection,
    config: &Config,
    app: &entity::applications::Model,
) -> Result<Model, Error> {
    if application::is_suspended(app, chrono::Utc::now()) {
        return Err(oauth_error(OauthErrorKind::InvalidClient));
    }
    create_device_session(db, config, app.id).await
}

async fn create_device_session(
    db: &DatabaseConnection,
    config: &Config,
    application_id: Id,
) -> Result<Model, Error> {
    let now = chrono::Utc::now();
    let model = Model {
        id: Id::new_v4(),
        application_id,
        flow: FlowType::DeviceCode,
        status: SessionStatus::Pending,
        user_id: None,
        redirect_uri: None,
        code_challenge: None,
        code_challenge_method: None,
        authorization_code: None,
        state: None,
        device_code: Some(opaque_code()),
        user_code: Some(user_code::generate_unique(db).await?),
        poll_interval_secs: Some(config.device_poll_interval_secs),
        last_polled_at: None,
        created_at: now.into(),
        expires_at: expiry_deadline(config, now),
    };

    let session = auth_session::create(db, model).await?;
    info!(
        "Initiated device-code session {} for application {}",
        session.id, application_id
    );
    Ok(session)
}

/// Records the authenticated user's approve/deny decision on a pending
/// session. For auth-code sessions the authorization code is minted here,
/// at decision time, in the same conditional update that flips the status,
/// so the code exists before the client ever asks and no reader observes a
/// code on a still-pending session.
///
/// Replaying the *same* decision is silent-idempotent and returns the same
/// outcome without re-mutating; a conflicting replay fails `InvalidState`.
pub async fn decide(
    db: &DatabaseConnection,
    session_id: Id,
    user_id: Id,
    approve: bool,
) -> Result<Decision, Error> {
    let session = auth_session::find_by_id(db, session_id)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::SessionNotFound))?;

    let now = chrono::Utc::now();
    if session.status == SessionStatus::Expired
        || (is_overdue(&session, now) && !matches!(session.status, SessionStatus::Consumed))
    {
        if session.status != SessionStatus::Expired {
            auth_session::mark_expired(db, session.id).await?;
        }
        return Err(oauth_error(OauthErrorKind::SessionExpired));
    }

    let requested = if approve {
        SessionStatus::Authorized
    } else {
        SessionStatus::Denied
    };

    if session.status != SessionStatus::Pending {
        return replay_decision(&session, requested, user_id);
    }

    let minted_code = match (approve, session.flow) {
        (true, FlowType::AuthCode) => Some(opaque_code()),
        _ => None,
    };

    let rows =
        auth_session::decide_if_pending(db, session.id, requested, user_id, minted_code.clone())
            .await?;

    if rows == 0 {
        // Raced another decision (or the sweep). Re-read and treat as replay.
        let current = auth_session::find_by_id(db, session_id)
            .await?
            .ok_or_else(|| oauth_error(OauthErrorKind::SessionNotFound))?;
        if current.status == SessionStatus::Expired {
            return Err(oauth_error(OauthErrorKind::SessionExpired));
        }
        return replay_decision(&current, requested, user_id);
    }

    info!("Session {} decided: {}", session.id, requested);

    let redirect_url = decision_redirect(&session, requested, minted_code.as_deref());
    Ok(Decision {
        status: requested,
        redirect_url,
    })
}

/// Resolves a decision that arrives after the session already left
/// `pending`. The same outcome from the same user is answered identically;
/// anything else is a state conflict.
fn replay_decision(
    session: &Model,
    requested: SessionStatus,
    user_id: Id,
) -> Result<Decision, Error> {
    let same_user = session.user_id == Some(user_id);
    let same_outcome = session.status == requested
        // An approved auth-code session may already have been redeemed by
        // the time the consent UI retries; that is still the same decision.
        || (requested == SessionStatus::Authorized && session.status == SessionStatus::Consumed);

    if same_user && same_outcome {
        let redirect_url =
            decision_redirect(session, requested, session.authorization_code.as_deref());
        return Ok(Decision {
            status: requested,
            redirect_url,
        });
    }

    warn!(
        "Conflicting decision replay on session {} (stored {}, requested {})",
        session.id, session.status, requested
    );
    Err(oauth_error(OauthErrorKind::InvalidState))
}

fn decision_redirect(
    session: &Model,
    status: SessionStatus,
    authorization_code: Option<&str>,
) -> Option<String> {
    if session.flow != FlowType::AuthCode {
        return None;
    }
    let uri = session.redirect_uri.as_deref()?;

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    match status {
        SessionStatus::Authorized | SessionStatus::Consumed => {
            pairs.push(("code", authorization_code?));
        }
        _ => pairs.push(("error", "access_denied")),
    }
    if let Some(state) = session.state.as_deref() {
        pairs.push(("state", state));
    }

    Some(append_query(uri, &pairs))
}

/// Read-only session lookup by id. Never mutates except to lazily resolve
/// an overdue deadline to `expired`.
pub async fn get_status(db: &DatabaseConnection, session_id: Id) -> Result<SessionView, Error> {
    let mut session = auth_session::find_by_id(db, session_id)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::SessionNotFound))?;

    if is_overdue(&session, chrono::Utc::now())
        && matches!(
            session.status,
            SessionStatus::Pending | SessionStatus::Authorized
        )
    {
        auth_session::mark_expired(db, session.id).await?;
        session.status = SessionStatus::Expired;
    }

    build_view(db, session).await
}

/// Resolves a *pending* device session by its human-typed user code, for the
/// device flow's "enter code" step. Sessions that have left `pending` are
/// not discoverable this way: once decided, the code stops resolving, which
/// keeps settled sessions from being enumerated after the fact.
pub async fn get_status_by_user_code(
    db: &DatabaseConnection,
    raw_user_code: &str,
) -> Result<SessionView, Error> {
    let code = user_code::normalize(raw_user_code);
    let session = auth_session::find_pending_by_user_code(db, &code)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::SessionNotFound))?;

    if is_overdue(&session, chrono::Utc::now()) {
        auth_session::mark_expired(db, session.id).await?;
        return Err(oauth_error(OauthErrorKind::SessionNotFound));
    }

    build_view(db, session).await
}

async fn build_view(db: &DatabaseConnection, session: Model) -> Result<SessionView, Error> {
    let app = entity_api::application::find_by_id(db, session.application_id)
        .await?
        .ok_or_else(|| internal_error("Session references an unknown application"))?;

    Ok(SessionView {
        session_id: session.id,
        app_id: app.id,
        app_name: app.name,
        logo_url: app.logo_url,
        flow: session.flow,
        status: session.status,
        expires_at: session.expires_at,
    })
}

/// Redeems a minted authorization code for a credential, exactly once.
///
/// Every failure here is `InvalidGrant`: an unknown code, a consumed or
/// expired session, a client mismatch and a failed PKCE verification are
/// deliberately indistinguishable to the caller.
pub async fn redeem_auth_code(
    db: &DatabaseConnection,
    config: &Config,
    code: &str,
    code_verifier: &str,
    client_id: &str,
) -> Result<Credential, Error> {
    let session = auth_session::find_by_authorization_code(db, code)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::InvalidGrant))?;

    if !client_matches(&session, client_id) {
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }

    let now = chrono::Utc::now();
    if is_overdue(&session, now) && session.status == SessionStatus::Authorized {
        auth_session::mark_expired(db, session.id).await?;
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }
    if session.status != SessionStatus::Authorized {
        // Consumed, expired or anything else: the code is gone.
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }

    let challenge = session
        .code_challenge
        .as_deref()
        .ok_or_else(|| internal_error("Auth-code session is missing its code challenge"))?;
    if !pkce::verify(code_verifier, challenge) {
        debug!("PKCE verification failed for session {}", session.id);
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }

    let user_id = session
        .user_id
        .ok_or_else(|| internal_error("Authorized session is missing its user"))?;

    // Mint before the status flip: the winner of the conditional update must
    // already hold the credential, so code invalidation and issuance are
    // observed together.
    let credential = access_token::mint(config, user_id, session.application_id)?;

    let rows = auth_session::consume_if_authorized(db, session.id).await?;
    if rows == 0 {
        // A concurrent redemption won; this caller gets nothing.
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }

    info!(
        "Auth-code session {} consumed for application {}",
        session.id, session.application_id
    );
    Ok(credential)
}

/// Redeems (polls) a device code. Expected non-fatal answers while the user
/// has not decided: `SlowDown` when polled faster than the session's
/// interval, `AuthorizationPending` otherwise. Terminal answers:
/// `AccessDenied`, `SessionExpired`, a credential, then `InvalidGrant`
/// forever after consumption.
pub async fn redeem_device_code(
    db: &DatabaseConnection,
    config: &Config,
    device_code: &str,
    client_id: &str,
) -> Result<Credential, Error> {
    let session = auth_session::find_by_device_code(db, device_code)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::InvalidGrant))?;

    if !client_matches(&session, client_id) {
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }
    if session.status == SessionStatus::Consumed {
        return Err(oauth_error(OauthErrorKind::InvalidGrant));
    }

    let now = chrono::Utc::now();

    // Server-side pacing: an early poll is answered (not dropped) so the
    // device can reset its timer, and the poll clock is not advanced, so a
    // compliant retry after the answer is on time.
    let interval = session
        .poll_interval_secs
        .unwrap_or(config.device_poll_interval_secs);
    if let Some(last) = session.last_polled_at {
        if now < last + chrono::Duration::seconds(interval as i64) {
            return Err(oauth_error(OauthErrorKind::SlowDown));
        }
    }
    auth_session::record_poll(db, session.id, now).await?;

    if session.status == SessionStatus::Denied {
        return Err(oauth_error(OauthErrorKind::AccessDenied));
    }

    if session.status == SessionStatus::Expired || is_overdue(&session, now) {
        if session.status != SessionStatus::Expired {
            auth_session::mark_expired(db, session.id).await?;
        }
        return Err(oauth_error(OauthErrorKind::SessionExpired));
    }

    match session.status {
        SessionStatus::Pending => Err(oauth_error(OauthErrorKind::AuthorizationPending)),
        SessionStatus::Authorized => {
            let user_id = session
                .user_id
                .ok_or_else(|| internal_error("Authorized session is missing its user"))?;

            let credential = access_token::mint(config, user_id, session.application_id)?;

            let rows = auth_session::consume_if_authorized(db, session.id).await?;
            if rows == 0 {
                return Err(oauth_error(OauthErrorKind::InvalidGrant));
            }

            info!(
                "Device-code session {} consumed for application {}",
                session.id, session.application_id
            );
            Ok(credential)
        }
        // Consumed/Denied/Expired handled above; nothing else exists.
        _ => Err(oauth_error(OauthErrorKind::InvalidGrant)),
    }
}

fn client_matches(session: &Model, client_id: &str) -> bool {
    match Id::parse_str(client_id) {
        Ok(id) => session.application_id == id,
        Err(_) => false,
    }
}
