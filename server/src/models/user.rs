use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Local mirror of an identity-provider account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile fields as delivered by the identity webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub profile_image_url: Option<String>,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// What other users get to see. Never includes the email address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub profile_image_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name: user.full_name,
            profile_image_url: user.profile_image_url,
        }
    }
}
