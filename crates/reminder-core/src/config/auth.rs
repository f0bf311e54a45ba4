//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Settings for verifying the session token issued by the login flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to verify HS256 session tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Name of the cookie carrying the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            cookie_name: default_cookie_name(),
        }
    }
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_cookie_name() -> String {
    "auth-token".to_string()
}
