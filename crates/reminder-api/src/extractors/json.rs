//! JSON body extractor with the API's error shape.

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::extract::rejection::JsonRejection;
use serde::de::DeserializeOwned;

use reminder_core::error::AppError;

use crate::error::ApiError;

/// Like [`axum::Json`], but malformed or incomplete bodies become a 400
/// with the standard error body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(ApiError(AppError::validation(rejection_message(&rejection))))
            }
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body",
        _ => "Missing or invalid required fields",
    }
}
