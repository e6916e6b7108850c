use serde::{Deserialize, Serialize};

use crate::models::{PublicUser, User, UserProfile};
use crate::revalidate::DASHBOARD_PATH;
use crate::state::AppState;
use crate::store::{Store, StoreError};
use crate::utils::error::AppError;

/// Payload of the identity provider's user webhooks.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IdentityEvent {
    #[serde(rename = "user.created")]
    UserCreated(IdentityUser),
    #[serde(rename = "user.updated")]
    UserUpdated(IdentityUser),
    #[serde(rename = "user.deleted")]
    UserDeleted(DeletedIdentity),
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAddress {
    pub email_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletedIdentity {
    pub id: String,
}

impl IdentityUser {
    /// The primary address is the first one listed.
    fn into_profile(self) -> Result<UserProfile, AppError> {
        let email = self
            .email_addresses
            .into_iter()
            .next()
            .map(|address| address.email_address)
            .filter(|address| !address.trim().is_empty())
            .ok_or_else(|| {
                AppError::ValidationError("User has no email address".to_string())
            })?;

        Ok(UserProfile {
            id: self.id,
            first_name: self.first_name.unwrap_or_default(),
            last_name: self.last_name.unwrap_or_default(),
            email,
            profile_image_url: self.profile_image_url.filter(|url| !url.is_empty()),
        })
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncOutcome {
    Created { user: User },
    Updated { user: User },
    Deleted { id: String },
}

/// Mirrors an identity-provider change into the local users table.
///
/// Webhooks may be redelivered or arrive out of order, so a create for a
/// known id updates it, an update for an unknown id creates it and a delete
/// of an unknown id succeeds.
pub async fn sync_identity<S: Store>(
    state: &AppState<S>,
    event: IdentityEvent,
) -> Result<SyncOutcome, AppError> {
    let outcome = match event {
        IdentityEvent::UserCreated(user) => {
            let profile = user.into_profile()?;
            match state.store.create_user(profile.clone()).await {
                Ok(user) => SyncOutcome::Created { user },
                Err(StoreError::Conflict) => SyncOutcome::Updated {
                    user: state.store.update_user(profile).await?,
                },
                Err(e) => return Err(e.into()),
            }
        }
        IdentityEvent::UserUpdated(user) => {
            let profile = user.into_profile()?;
            match state.store.update_user(profile.clone()).await {
                Ok(user) => SyncOutcome::Updated { user },
                Err(StoreError::NotFound) => SyncOutcome::Created {
                    user: state.store.create_user(profile).await?,
                },
                Err(e) => return Err(e.into()),
            }
        }
        IdentityEvent::UserDeleted(deleted) => {
            match state.store.delete_user(&deleted.id).await {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            state.revalidator.revalidate(DASHBOARD_PATH);
            SyncOutcome::Deleted { id: deleted.id }
        }
    };

    match &outcome {
        SyncOutcome::Created { user } => tracing::info!(user_id = %user.id, "User created"),
        SyncOutcome::Updated { user } => tracing::info!(user_id = %user.id, "User updated"),
        SyncOutcome::Deleted { id } => tracing::info!(user_id = %id, "User deleted"),
    }
    Ok(outcome)
}

pub async fn public_profile<S: Store>(
    state: &AppState<S>,
    user_id: &str,
) -> Result<PublicUser, AppError> {
    state
        .store
        .find_user(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| AppError::NotFound(format!("User with id '{user_id}' was not found")))
}
