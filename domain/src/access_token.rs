//! Credential issuance boundary: minting and validating bearer access tokens.
//!
//! Tokens are HS256 JWTs signed with the broker's configured secret. The
//! same secret validates the bearer identities the consent endpoints accept,
//! which is how the excluded login subsystem hands an authenticated user to
//! this one.

use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use entity::Id;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use serde::{Deserialize, Serialize};
use service::config::Config;

/// Claims carried by every minted access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// The user the credential was issued for.
    pub sub: Id,
    /// The client application the credential was issued to.
    pub app_id: Id,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A one-shot credential handed back from the token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn signing_key(config: &Config) -> Result<String, Error> {
    config.token_signing_key().ok_or_else(|| {
        warn!("No token signing key configured");
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    })
}

/// Mints a bearer credential for `user_id` scoped to `application_id`.
pub fn mint(config: &Config, user_id: Id, application_id: Id) -> Result<Credential, Error> {
    let key = signing_key(config)?;
    let now = chrono::Utc::now().timestamp();

    let claims = AccessTokenClaims {
        sub: user_id,
        app_id: application_id,
        iss: config.issuer.clone(),
        iat: now,
        exp: now + config.access_token_expiry_secs,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )?;

    Ok(Credential {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_expiry_secs,
    })
}

/// Decodes and validates a bearer token, returning its claims.
/// Expiry is checked by the decoder; issuer mismatches are rejected.
pub fn validate(config: &Config, token: &str) -> Result<AccessTokenClaims, Error> {
    let key = signing_key(config)?;

    let mut validation = Validation::default();
    validation.set_issuer(&[&config.issuer]);

    let data = decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &validation,
    )?;

    Ok(data.claims)
}
