//! Redirect URI validation for the authorization code flow.
//!
//! Membership is exact-match against the application's registered trusted
//! URIs. No wildcard or prefix matching: anything looser reopens the
//! open-redirect hole this allow-list exists to close. Validation happens at
//! initiate time, before any session row is written, so no session ever
//! exists for an untrusted callback.

use crate::error::{oauth_error, Error, OauthErrorKind};
use entity::Id;
use sea_orm::DatabaseConnection;

/// Checks `redirect_uri` against the application's trusted set, failing with
/// `InvalidRedirect` when it is not an exact member.
pub async fn validate(
    db: &DatabaseConnection,
    application_id: Id,
    redirect_uri: &str,
) -> Result<(), Error> {
    if redirect_uri.is_empty() {
        return Err(oauth_error(OauthErrorKind::InvalidRedirect));
    }

    let trusted =
        entity_api::application::is_trusted_redirect_uri(db, application_id, redirect_uri).await?;

    if trusted {
        Ok(())
    } else {
        Err(oauth_error(OauthErrorKind::InvalidRedirect))
    }
}
