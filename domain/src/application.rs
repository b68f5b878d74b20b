//! Application registry resolution: the boundary to the (excluded)
//! application-administration subsystem. The broker only ever needs to
//! resolve a client id or API key to display metadata, the trusted redirect
//! set, and the suspension window.

use crate::error::{oauth_error, Error, OauthErrorKind};
use entity::applications;
use entity::Id;
use log::warn;
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};

pub use entity_api::application::{add_trusted_redirect_uri, create};

/// Whether the application is inside an active suspension window.
pub fn is_suspended(app: &applications::Model, now: chrono::DateTime<chrono::Utc>) -> bool {
    app.suspended_until.map(|until| until > now).unwrap_or(false)
}

/// Resolves a client application by id, refusing unknown and suspended apps
/// with `InvalidClient`.
pub async fn resolve(db: &DatabaseConnection, id: Id) -> Result<applications::Model, Error> {
    let app = entity_api::application::find_by_id(db, id)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::InvalidClient))?;

    if is_suspended(&app, chrono::Utc::now()) {
        warn!("Refusing suspended application {}", app.id);
        return Err(oauth_error(OauthErrorKind::InvalidClient));
    }

    Ok(app)
}

/// Resolves a client id arriving as a raw request string. A malformed id is
/// the same failure as an unknown one, so callers leak nothing about which.
pub async fn resolve_str(
    db: &DatabaseConnection,
    client_id: &str,
) -> Result<applications::Model, Error> {
    let id =
        Id::parse_str(client_id).map_err(|_| oauth_error(OauthErrorKind::InvalidClient))?;
    resolve(db, id).await
}

/// Resolves an application from a raw server-to-server API key by SHA-256
/// digest. The raw key never touches storage.
pub async fn resolve_by_api_key(
    db: &DatabaseConnection,
    api_key: &str,
) -> Result<applications::Model, Error> {
    let digest = api_key_digest(api_key);

    let app = entity_api::application::find_by_api_key_hash(db, &digest)
        .await?
        .ok_or_else(|| oauth_error(OauthErrorKind::InvalidClient))?;

    if is_suspended(&app, chrono::Utc::now()) {
        warn!("Refusing suspended application {}", app.id);
        return Err(oauth_error(OauthErrorKind::InvalidClient));
    }

    Ok(app)
}

/// Lowercase hex SHA-256 of a raw API key, the stored lookup form.
pub fn api_key_digest(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Mints a raw API key for a new application. Shown once; only the digest
/// is ever stored.
pub fn generate_api_key() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;

    let random_bytes: [u8; 48] = rand::thread_rng().gen();
    format!("sk_{}", URL_SAFE_NO_PAD.encode(random_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app(suspended_until: Option<chrono::DateTime<chrono::Utc>>) -> applications::Model {
        let now = chrono::Utc::now();
        applications::Model {
            id: Id::new_v4(),
            name: "Example App".to_string(),
            logo_url: None,
            api_key_hash: None,
            device_code_enabled: true,
            suspended_until: suspended_until.map(Into::into),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn generated_api_keys_are_prefixed_and_unique() {
        let key = generate_api_key();
        assert!(key.starts_with("sk_"));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn api_key_digest_is_lowercase_hex_sha256() {
        // echo -n "secret" | sha256sum
        assert_eq!(
            api_key_digest("secret"),
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
    }

    #[test]
    fn suspension_window_in_the_future_suspends() {
        let now = chrono::Utc::now();
        let app = test_app(Some(now + chrono::Duration::hours(1)));
        assert!(is_suspended(&app, now));
    }

    #[test]
    fn elapsed_suspension_window_does_not_suspend() {
        let now = chrono::Utc::now();
        let app = test_app(Some(now - chrono::Duration::hours(1)));
        assert!(!is_suspended(&app, now));

        let never_suspended = test_app(None);
        assert!(!is_suspended(&never_suspended, now));
    }
}
