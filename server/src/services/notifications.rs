use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::mail::layout::render_post_notification;
use crate::mail::OutgoingEmail;
use crate::models::{Event, Post, PostType};
use crate::revalidate::event_path;
use crate::state::AppState;
use crate::store::Store;

/// How delivery of a post notification went. Never turns into a request
/// error: the post is already saved when this is computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Sent { recipients: usize },
    NoSubscribers,
    Failed { error: String },
}

pub fn subject_for(post_type: PostType, event_title: &str) -> String {
    match post_type {
        PostType::Manual => format!("New post in {event_title}"),
        PostType::Auto => format!("Important changes in {event_title}"),
    }
}

pub fn build_email(
    config: &Config,
    event: &Event,
    post: &Post,
    recipients: Vec<String>,
) -> OutgoingEmail {
    let event_url = format!("{}{}", config.public_base_url, event_path(event.id));
    let body = render_post_notification(post.post_type, &event.title, &post.message, &event_url);
    OutgoingEmail {
        from: config.mail.from.clone(),
        to: config.mail.from.clone(),
        bcc: recipients,
        subject: subject_for(post.post_type, &event.title),
        text: body.text,
        html: body.html,
    }
}

/// Emails `post` to everyone subscribed to `event`, in one message with the
/// subscribers as blind copies.
pub async fn notify_subscribers<S: Store>(
    state: &AppState<S>,
    event: &Event,
    post: &Post,
) -> NotificationOutcome {
    let recipients = match state.store.subscriber_emails(event.id).await {
        Ok(recipients) => recipients,
        Err(e) => {
            tracing::warn!(event_id = %event.id, error = %e, "Could not load subscribers");
            return NotificationOutcome::Failed {
                error: "Subscribers could not be loaded".to_string(),
            };
        }
    };
    if recipients.is_empty() {
        return NotificationOutcome::NoSubscribers;
    }

    let count = recipients.len();
    let email = build_email(&state.config, event, post, recipients);
    let mailer = Arc::clone(&state.mailer);

    match tokio::task::spawn_blocking(move || mailer.send(&email)).await {
        Ok(Ok(())) => {
            tracing::info!(event_id = %event.id, post_id = %post.id, recipients = count, "Notification sent");
            NotificationOutcome::Sent { recipients: count }
        }
        Ok(Err(e)) => {
            tracing::warn!(event_id = %event.id, post_id = %post.id, error = %e, "Notification delivery failed");
            NotificationOutcome::Failed {
                error: "Notification email could not be delivered".to_string(),
            }
        }
        Err(e) => {
            tracing::error!(event_id = %event.id, post_id = %post.id, error = %e, "Notification task panicked");
            NotificationOutcome::Failed {
                error: "Notification email could not be delivered".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::RecordingMailer;
    use crate::services::fixtures::{harness, harness_with_mailer, seeded_event};

    #[test]
    fn test_subjects_by_post_type() {
        assert_eq!(subject_for(PostType::Manual, "Party"), "New post in Party");
        assert_eq!(
            subject_for(PostType::Auto, "Party"),
            "Important changes in Party"
        );
    }

    #[tokio::test]
    async fn test_no_subscribers_sends_nothing() {
        let h = harness();
        let event = seeded_event(&h).await;
        let post = h
            .state
            .store
            .create_post(event.id, "Hello", PostType::Manual)
            .await
            .unwrap();

        let outcome = notify_subscribers(&h.state, &event, &post).await;
        assert_eq!(outcome, NotificationOutcome::NoSubscribers);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_single_message_to_all_subscribers() {
        let h = harness();
        let event = seeded_event(&h).await;
        h.state.store.create_subscription("host", event.id).await.unwrap();
        h.state.store.create_subscription("guest", event.id).await.unwrap();
        let post = h
            .state
            .store
            .create_post(event.id, "Location was changed to Brno", PostType::Auto)
            .await
            .unwrap();

        let outcome = notify_subscribers(&h.state, &event, &post).await;

        assert_eq!(outcome, NotificationOutcome::Sent { recipients: 2 });
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Important changes in Housewarming");
        assert_eq!(sent[0].bcc.len(), 2);
        assert_eq!(sent[0].to, "Upfesto <info@upfesto.com>");
        assert!(sent[0].text.starts_with("Location was changed to Brno"));
        assert!(sent[0]
            .html
            .contains(&format!("http://localhost:3000/event/{}", event.id)));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_reported_not_raised() {
        let h = harness_with_mailer(RecordingMailer::failing("smtp down"));
        let event = seeded_event(&h).await;
        h.state.store.create_subscription("guest", event.id).await.unwrap();
        let post = h
            .state
            .store
            .create_post(event.id, "Hello", PostType::Manual)
            .await
            .unwrap();

        let outcome = notify_subscribers(&h.state, &event, &post).await;
        assert!(matches!(outcome, NotificationOutcome::Failed { .. }));
        assert!(h.state.store.find_post(post.id).await.unwrap().is_some());
    }
}
