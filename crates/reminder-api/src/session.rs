//! Session token verification.
//!
//! The login flow lives outside this service; it issues an HS256 token
//! whose claims carry the user's id and email. This module only verifies
//! it.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use reminder_core::config::AuthConfig;
use reminder_core::error::AppError;
use reminder_core::types::UserId;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// The user the token was issued to.
    pub user_id: UserId,
    /// Where the user's reminders are sent.
    pub email: String,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Verifies session tokens against the shared secret.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    cookie_name: String,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("cookie_name", &self.cookie_name)
            .field("validation", &self.validation)
            .finish()
    }
}

impl SessionVerifier {
    /// Creates a verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// Name of the cookie the token is read from.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Checks the signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AppError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                AppError::unauthorized("Invalid token")
            })
    }
}

/// Signs claims with `secret`. Used by local tooling and tests to mint tokens.
pub fn sign(claims: &SessionClaims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))
}
