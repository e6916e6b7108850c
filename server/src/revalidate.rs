//! Marking frontend views stale after a successful write.
//!
//! Revalidation is fire-and-forget: it never fails the request that
//! triggered it.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use uuid::Uuid;

use crate::config::RevalidateConfig;

pub const DASHBOARD_PATH: &str = "/dashboard";

pub fn event_path(event_id: Uuid) -> String {
    format!("/event/{event_id}")
}

pub trait Revalidator: Send + Sync {
    fn revalidate(&self, path: &str);
}

/// Only logs; used when no frontend hook is configured.
pub struct LogRevalidator;

impl Revalidator for LogRevalidator {
    fn revalidate(&self, path: &str) {
        tracing::debug!(path, "View marked stale");
    }
}

#[derive(Serialize)]
struct RevalidateRequest<'a> {
    path: &'a str,
}

/// Calls the frontend's on-demand revalidation endpoint.
pub struct HttpRevalidator {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpRevalidator {
    pub fn new(config: &RevalidateConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            token: config.token.clone(),
        }
    }
}

impl Revalidator for HttpRevalidator {
    fn revalidate(&self, path: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(path, "No async runtime, skipping revalidation");
            return;
        };

        let mut request = self
            .client
            .post(&self.url)
            .json(&RevalidateRequest { path });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let path = path.to_string();
        runtime.spawn(async move {
            match request.send().await.and_then(|r| r.error_for_status()) {
                Ok(_) => tracing::debug!(path = %path, "View revalidated"),
                Err(e) => tracing::warn!(path = %path, error = %e, "Revalidation request failed"),
            }
        });
    }
}

/// Remembers every revalidated path in order.
#[derive(Debug, Default)]
pub struct RecordingRevalidator {
    paths: Mutex<Vec<String>>,
}

impl RecordingRevalidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Revalidator for RecordingRevalidator {
    fn revalidate(&self, path: &str) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}

pub fn create_revalidator(config: Option<&RevalidateConfig>) -> Arc<dyn Revalidator> {
    match config {
        Some(config) => {
            tracing::info!(url = %config.url, "Revalidation: calling frontend hook");
            Arc::new(HttpRevalidator::new(config))
        }
        None => {
            tracing::info!("Revalidation: REVALIDATE_URL not set, logging only");
            Arc::new(LogRevalidator)
        }
    }
}
