//! `AuthUser` extractor: reads the session token from the cookie or the
//! `Authorization` header, verifies it, and injects the caller's identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::extract::CookieJar;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use reminder_core::error::AppError;
use reminder_service::Identity;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl std::ops::Deref for AuthUser {
    type Target = Identity;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Cookie first, then Bearer header
        let from_cookie = CookieJar::from_headers(&parts.headers)
            .get(state.sessions.cookie_name())
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty());

        let token = match from_cookie {
            Some(token) => token,
            None => {
                TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                    .await
                    .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
                    .map_err(|_| AppError::unauthorized("No token found"))?
            }
        };

        let claims = state.sessions.verify(&token)?;
        Ok(AuthUser(Identity::new(claims.user_id, claims.email)))
    }
}
