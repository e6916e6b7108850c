use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Event, Post, PostType};
use crate::revalidate::event_path;
use crate::services::notifications::{notify_subscribers, NotificationOutcome};
use crate::services::{ensure_host, load_event};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::validation::{require_text, MAX_POST_LEN};

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub message: String,
}

impl PostForm {
    fn validated_message(&self) -> Result<String, AppError> {
        require_text("Message", &self.message, MAX_POST_LEN)
    }
}

/// A saved post together with the outcome of emailing it to subscribers.
#[derive(Debug, Serialize)]
pub struct PublishedPost {
    pub post: Post,
    pub notification: NotificationOutcome,
}

/// Saves a post on `event` and notifies subscribers. The post stays saved
/// whatever happens to the notification.
pub async fn publish<S: Store>(
    state: &AppState<S>,
    event: &Event,
    message: &str,
    post_type: PostType,
) -> Result<PublishedPost, AppError> {
    let post = state.store.create_post(event.id, message, post_type).await?;
    state.revalidator.revalidate(&event_path(event.id));
    tracing::info!(event_id = %event.id, post_id = %post.id, ?post_type, "Post created");

    let notification = notify_subscribers(state, event, &post).await;
    Ok(PublishedPost { post, notification })
}

pub async fn create_post<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    event_id: Uuid,
    form: PostForm,
) -> Result<PublishedPost, AppError> {
    let message = form.validated_message()?;
    let event = load_event(&state.store, event_id).await?;
    ensure_host(&event, user_id)?;
    publish(state, &event, &message, PostType::Manual).await
}

async fn load_owned_post<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    post_id: Uuid,
) -> Result<Post, AppError> {
    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post with id '{post_id}' was not found")))?;
    let event = load_event(&state.store, post.event_id).await?;
    ensure_host(&event, user_id)?;
    Ok(post)
}

pub async fn update_post<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    post_id: Uuid,
    form: PostForm,
) -> Result<Post, AppError> {
    let message = form.validated_message()?;
    let post = load_owned_post(state, user_id, post_id).await?;

    let updated = state.store.update_post_message(post.id, &message).await?;
    state.revalidator.revalidate(&event_path(updated.event_id));
    Ok(updated)
}

pub async fn delete_post<S: Store>(
    state: &AppState<S>,
    user_id: &str,
    post_id: Uuid,
) -> Result<Post, AppError> {
    let post = load_owned_post(state, user_id, post_id).await?;

    state.store.delete_post(post.id).await?;
    state.revalidator.revalidate(&event_path(post.event_id));
    tracing::info!(event_id = %post.event_id, post_id = %post.id, "Post deleted");
    Ok(post)
}

pub async fn list_posts<S: Store>(
    state: &AppState<S>,
    event_id: Uuid,
) -> Result<Vec<Post>, AppError> {
    load_event(&state.store, event_id).await?;
    Ok(state.store.list_posts(event_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::RecordingMailer;
    use crate::services::fixtures::{harness, harness_with_mailer, seeded_event};

    fn form(message: &str) -> PostForm {
        PostForm {
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_host_post_is_manual_and_emailed() {
        let h = harness();
        let event = seeded_event(&h).await;
        h.state.store.create_subscription("guest", event.id).await.unwrap();

        let published = create_post(&h.state, "host", event.id, form("Bring snacks"))
            .await
            .unwrap();

        assert_eq!(published.post.post_type, PostType::Manual);
        assert_eq!(
            published.notification,
            NotificationOutcome::Sent { recipients: 1 }
        );
        assert_eq!(h.mailer.sent()[0].subject, "New post in Housewarming");
        assert_eq!(h.revalidator.paths(), vec![event_path(event.id)]);
    }

    #[tokio::test]
    async fn test_guest_cannot_post() {
        let h = harness();
        let event = seeded_event(&h).await;
        let err = create_post(&h.state, "guest", event.id, form("Hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let h = harness();
        let event = seeded_event(&h).await;
        let err = create_post(&h.state, "host", event.id, form("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_post_survives_failed_notification() {
        let h = harness_with_mailer(RecordingMailer::failing("smtp down"));
        let event = seeded_event(&h).await;
        h.state.store.create_subscription("guest", event.id).await.unwrap();

        let published = create_post(&h.state, "host", event.id, form("Bring snacks"))
            .await
            .unwrap();

        assert!(matches!(
            published.notification,
            NotificationOutcome::Failed { .. }
        ));
        let posts = list_posts(&h.state, event.id).await.unwrap();
        assert_eq!(posts, vec![published.post]);
    }

    #[tokio::test]
    async fn test_update_and_delete_post() {
        let h = harness();
        let event = seeded_event(&h).await;
        let published = create_post(&h.state, "host", event.id, form("Draft"))
            .await
            .unwrap();

        let updated = update_post(&h.state, "host", published.post.id, form("Final"))
            .await
            .unwrap();
        assert_eq!(updated.message, "Final");

        let err = delete_post(&h.state, "guest", published.post.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        delete_post(&h.state, "host", published.post.id).await.unwrap();
        assert!(list_posts(&h.state, event.id).await.unwrap().is_empty());
    }
}
