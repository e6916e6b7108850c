use std::env;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use chrono_tz::Tz;
use thiserror::Error;

use crate::webhook::WebhookSecret;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3001));
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
const DEFAULT_MAIL_FROM: &str = "Upfesto <info@upfesto.com>";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEV_JWT_SECRET: &str = "upfesto-development-secret";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{0} must be set in production")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    /// Without SMTP settings outgoing mail is only recorded and logged.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct RevalidateConfig {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Without a database URL the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub production: bool,
    pub cors_allowed_origins: Vec<String>,
    pub auth_jwt_secret: String,
    /// Signing secret of identity webhooks; the route is disabled without it.
    pub identity_webhook_secret: Option<WebhookSecret>,
    /// Base of the links placed in notification emails.
    pub public_base_url: String,
    /// Zone in which event dates and times are entered and displayed.
    pub event_timezone: Tz,
    pub mail: MailConfig,
    pub revalidate: Option<RevalidateConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: DEFAULT_BIND_ADDR,
            production: false,
            cors_allowed_origins: split_list(DEFAULT_ALLOWED_ORIGINS),
            auth_jwt_secret: DEV_JWT_SECRET.to_string(),
            identity_webhook_secret: None,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            event_timezone: chrono_tz::Europe::Prague,
            mail: MailConfig {
                from: DEFAULT_MAIL_FROM.to_string(),
                smtp: None,
            },
            revalidate: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let production = get("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        let auth_jwt_secret = match get("AUTH_JWT_SECRET") {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing("AUTH_JWT_SECRET")),
            None => {
                tracing::warn!("AUTH_JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?,
            None => DEFAULT_BIND_ADDR,
        };

        let identity_webhook_secret = get("IDENTITY_WEBHOOK_SECRET")
            .map(|raw| WebhookSecret::parse(&raw))
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                key: "IDENTITY_WEBHOOK_SECRET",
                reason: e.to_string(),
            })?;

        let event_timezone = match get("EVENT_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                key: "EVENT_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => chrono_tz::Europe::Prague,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let smtp = match get("SMTP_HOST") {
            Some(host) => {
                let port = match get("SMTP_PORT") {
                    Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                        key: "SMTP_PORT",
                        reason: e.to_string(),
                    })?,
                    None => DEFAULT_SMTP_PORT,
                };
                Some(SmtpConfig {
                    host,
                    port,
                    user: get("SMTP_USER"),
                    password: get("SMTP_PASSWORD"),
                })
            }
            None => None,
        };

        let revalidate = get("REVALIDATE_URL").map(|url| RevalidateConfig {
            url,
            token: get("REVALIDATE_TOKEN"),
        });

        Ok(Self {
            database_url: get("DATABASE_URL"),
            database_max_connections,
            bind_addr,
            production,
            cors_allowed_origins: split_list(
                &get("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            ),
            auth_jwt_secret,
            identity_webhook_secret,
            public_base_url: get("PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            event_timezone,
            mail: MailConfig {
                from: get("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
                smtp,
            },
            revalidate,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
