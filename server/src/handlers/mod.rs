use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Json, Path, Request};
use axum::http::{request::Parts, StatusCode};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod attendance;
pub mod events;
pub mod posts;
pub mod subscriptions;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "upfesto-api",
    };

    success(payload, "Health check successful")
}

/// JSON request body whose rejections use the error envelope.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(JsonBody(value))
    }
}

/// Keeps the rejection's own status for transport problems; anything wrong
/// with the JSON itself is a validation error.
fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection.status() {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => AppError::UnsupportedMediaType(
            "Expected a request with `Content-Type: application/json`".to_string(),
        ),
        StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::PayloadTooLarge("Request body is too large".to_string())
        }
        _ => AppError::ValidationError(rejection.body_text()),
    }
}

/// A single UUID path segment.
pub struct IdPath(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::ValidationError("Invalid id in path".to_string()))?;
        Ok(IdPath(id))
    }
}
