//! Outgoing email.
//!
//! Delivery sits behind the [`Mailer`] trait so the notification code never
//! talks to SMTP directly. [`SmtpMailer`] is the production sender and
//! [`RecordingMailer`] keeps messages in memory for development and tests.

use std::sync::{Arc, Mutex, PoisonError};

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

use crate::config::{MailConfig, SmtpConfig};

pub mod layout;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A single message for every recipient at once. Recipients go in `bcc`
/// so they never see each other's addresses; `to` is the visible addressee.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Blocking delivery; callers on the async runtime go through
/// `tokio::task::spawn_blocking`.
pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let transport = match (&config.user, &config.password) {
            (Some(user), Some(password)) => SmtpTransport::starttls_relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?
                .credentials(Credentials::new(user.clone(), password.clone()))
                .port(config.port)
                .build(),
            // Local relays such as MailHog accept unauthenticated plain SMTP
            _ => SmtpTransport::builder_dangerous(&config.host)
                .port(config.port)
                .build(),
        };
        Ok(Self { transport })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse::<Mailbox>().map_err(|e| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.clone());
    for recipient in &email.bcc {
        builder = builder.bcc(parse_mailbox(recipient)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))
        .map_err(|e| MailError::Build(e.to_string()))
}

impl Mailer for SmtpMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(email)?;
        self.transport
            .send(&message)
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Keeps every message instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_with: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails with the given transport error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if let Some(reason) = &self.fail_with {
            return Err(MailError::Transport(reason.clone()));
        }
        tracing::info!(
            recipients = email.bcc.len(),
            subject = %email.subject,
            "Recorded outgoing email"
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email.clone());
        Ok(())
    }
}

pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Mail: delivering over SMTP");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            tracing::warn!("Mail: SMTP_HOST not set, outgoing email is only recorded");
            Ok(Arc::new(RecordingMailer::new()))
        }
    }
}
