use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;

/// Session claims issued by the identity provider. `sub` is the user id.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// The authenticated requester.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// The requester, if a bearer token was sent at all.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

pub fn issue_token(
    user_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
}

fn authenticate(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let claims = validate_token(token, secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::AuthError("Invalid or expired session".to_string())
    })?;
    Ok(AuthUser {
        user_id: claims.sub,
    })
}

#[async_trait]
impl<S: Store> FromRequestParts<AppState<S>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::AuthError("Sign in to continue".to_string()))?;
        authenticate(token, &state.config.auth_jwt_secret)
    }
}

#[async_trait]
impl<S: Store> FromRequestParts<AppState<S>> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => authenticate(token, &state.config.auth_jwt_secret)
                .map(|user| MaybeAuthUser(Some(user))),
            None => Ok(MaybeAuthUser(None)),
        }
    }
}
