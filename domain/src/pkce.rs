//! PKCE (Proof Key for Code Exchange) support for the authorization code flow.
//!
//! Implements the S256 transform of RFC 7636. The broker side only ever
//! *verifies*; generation exists for clients, tests and the seed tooling.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// The only accepted code challenge method. `plain` is rejected at initiate
/// time, before a session exists.
pub const METHOD_S256: &str = "S256";

/// PKCE code verifier (random string held by the client).
#[derive(Debug, Clone)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Generate a new random verifier (43 base64url characters).
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        Self(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    pub fn from_string(verifier: String) -> Self {
        Self(verifier)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate the corresponding code challenge.
    pub fn challenge(&self) -> CodeChallenge {
        CodeChallenge::from_verifier(self)
    }
}

/// PKCE code challenge (base64url-encoded SHA-256 of the verifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    pub fn from_verifier(verifier: &CodeVerifier) -> Self {
        Self(s256(verifier.as_str()))
    }

    pub fn from_string(challenge: String) -> Self {
        Self(challenge)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Verifies a presented code verifier against a stored challenge:
/// base64url(SHA-256(verifier)) compared byte-for-byte. Stateless; the
/// caller reports any `false` as `invalid_grant` without distinguishing it
/// from an unknown code.
pub fn verify(code_verifier: &str, code_challenge: &str) -> bool {
    s256(code_verifier) == code_challenge
}

fn s256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
