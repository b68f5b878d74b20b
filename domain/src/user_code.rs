//! Human-typed user codes for the device flow.
//!
//! Codes are short enough to type on a second screen and drawn from an
//! alphabet without `I`, `O`, `0` and `1`, which read ambiguously on small
//! displays. Uniqueness is only required among *pending* device sessions;
//! settled sessions release their code.

use crate::error::{internal_error, Error};
use rand::Rng;
use sea_orm::DatabaseConnection;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;
const MAX_COLLISION_RETRIES: usize = 5;

/// Generates one candidate user code, e.g. `ABCD2345`.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Normalizes a user-entered code for lookup: codes are stored uppercase.
pub fn normalize(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Generates a code that no pending device session currently claims.
pub(crate) async fn generate_unique(db: &DatabaseConnection) -> Result<String, Error> {
    for _ in 0..MAX_COLLISION_RETRIES {
        let candidate = generate();
        if !entity_api::auth_session::user_code_in_use(db, &candidate).await? {
            return Ok(candidate);
        }
    }
    // 32^8 codes; repeated collisions mean something is very wrong upstream.
    Err(internal_error("Exhausted user code collision retries"))
}
