//! Signature checks for identity-provider webhooks.
//!
//! Deliveries are signed with HMAC-SHA256 over `{id}.{timestamp}.{body}`
//! using the base64 key from a `whsec_` secret. The `svix-signature` header
//! holds one or more space separated `v1,<base64>` entries.

use std::fmt;

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::utils::error::AppError;

pub const ID_HEADER: &str = "svix-id";
pub const TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SIGNATURE_HEADER: &str = "svix-signature";

/// How far a delivery timestamp may drift from the server clock.
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq)]
pub enum WebhookError {
    #[error("webhook secret is not valid base64")]
    InvalidSecret,

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("timestamp is not a number")]
    InvalidTimestamp,

    #[error("timestamp outside the accepted window")]
    StaleTimestamp,

    #[error("no signature matched")]
    SignatureMismatch,
}

/// Decoded signing key.
#[derive(Clone)]
pub struct WebhookSecret {
    key: Vec<u8>,
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}

impl WebhookSecret {
    /// Accepts the secret with or without its `whsec_` prefix.
    pub fn parse(raw: &str) -> Result<Self, WebhookError> {
        let encoded = raw.strip_prefix(SECRET_PREFIX).unwrap_or(raw);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self { key })
    }

    fn mac(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Signature header value for a delivery, as the provider would send it.
    pub fn sign(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
        let mac = self.mac(msg_id, &timestamp.to_string(), body)?;
        Ok(format!("{SIGNATURE_VERSION},{}", STANDARD.encode(mac)))
    }

    /// Checks the delivery headers against `body`. `now` is a unix timestamp.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let msg_id = header(headers, ID_HEADER)?;
        let timestamp = header(headers, TIMESTAMP_HEADER)?;
        let signatures = header(headers, SIGNATURE_HEADER)?;

        let sent_at: i64 = timestamp
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        if (now - sent_at).abs() > TIMESTAMP_TOLERANCE_SECS {
            return Err(WebhookError::StaleTimestamp);
        }

        let expected = self.mac(msg_id, timestamp, body)?;
        let matched = signatures
            .split(' ')
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            .any(|signature| bool::from(expected.as_slice().ct_eq(signature.as_slice())));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}

/// Gate for the identity webhook route. Without a configured secret the
/// route is disabled.
pub fn verify_identity_webhook(
    secret: Option<&WebhookSecret>,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<(), AppError> {
    let Some(secret) = secret else {
        tracing::warn!("Identity webhook called but IDENTITY_WEBHOOK_SECRET is not configured");
        return Err(AppError::Forbidden("Webhook is not enabled".to_string()));
    };
    secret.verify(headers, body, now).map_err(|e| {
        tracing::warn!(error = %e, "Rejected identity webhook");
        AppError::AuthError("Invalid webhook signature".to_string())
    })
}
