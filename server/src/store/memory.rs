use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Attendance, AttendanceResponse, Attendee, Event, EventDraft, Post, PostType, RespondedEvent,
    Subscription, User, UserProfile,
};

/// Composite key shared by attendance and subscription rows.
type MembershipKey = (String, Uuid);

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    events: HashMap<Uuid, Event>,
    attendance: HashMap<MembershipKey, Attendance>,
    posts: HashMap<Uuid, Post>,
    subscriptions: HashMap<MembershipKey, Subscription>,
}

impl Tables {
    fn ensure_references(&self, user_id: &str, event_id: Uuid) -> StoreResult<()> {
        if self.users.contains_key(user_id) && self.events.contains_key(&event_id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference)
        }
    }

    fn remove_event_cascade(&mut self, event_id: Uuid) {
        self.events.remove(&event_id);
        self.attendance.retain(|(_, id), _| *id != event_id);
        self.subscriptions.retain(|(_, id), _| *id != event_id);
        self.posts.retain(|_, post| post.event_id != event_id);
    }
}

/// Process-local store with the same constraints as the Postgres schema:
/// composite primary keys, foreign keys and cascading deletes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_start(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|event| event.date_from);
    events
}

impl Store for MemoryStore {
    async fn create_event(&self, host_id: &str, draft: EventDraft) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(host_id) {
            return Err(StoreError::MissingReference);
        }

        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            location_address: draft.location_address,
            location_lat: draft.location_lat,
            location_lon: draft.location_lon,
            image_url: draft.image_url,
            date_from: draft.date_from,
            date_to: draft.date_to,
            host_id: host_id.to_string(),
            created_at: now,
        };
        let attendance = Attendance {
            user_id: host_id.to_string(),
            event_id: event.id,
            response: AttendanceResponse::Yes,
            created_at: now,
        };

        tables.events.insert(event.id, event.clone());
        tables
            .attendance
            .insert((host_id.to_string(), event.id), attendance);
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn update_event(&self, id: Uuid, draft: EventDraft) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(&id).ok_or(StoreError::NotFound)?;
        event.title = draft.title;
        event.description = draft.description;
        event.location_address = draft.location_address;
        event.location_lat = draft.location_lat;
        event.location_lon = draft.location_lon;
        event.image_url = draft.image_url;
        event.date_from = draft.date_from;
        event.date_to = draft.date_to;
        Ok(event.clone())
    }

    async fn set_event_image(&self, id: Uuid, image_url: Option<String>) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(&id).ok_or(StoreError::NotFound)?;
        event.image_url = image_url;
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        tables.remove_event_cascade(id);
        Ok(())
    }

    async fn list_hosted_events(&self, host_id: &str) -> StoreResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let events = tables
            .events
            .values()
            .filter(|event| event.host_id == host_id)
            .cloned()
            .collect();
        Ok(sorted_by_start(events))
    }

    async fn list_responded_events(&self, user_id: &str) -> StoreResult<Vec<RespondedEvent>> {
        let tables = self.tables.read().await;
        let mut events: Vec<RespondedEvent> = tables
            .attendance
            .values()
            .filter(|attendance| attendance.user_id == user_id)
            .filter_map(|attendance| {
                tables
                    .events
                    .get(&attendance.event_id)
                    .filter(|event| event.host_id != user_id)
                    .map(|event| RespondedEvent {
                        event: event.clone(),
                        response: attendance.response,
                    })
            })
            .collect();
        events.sort_by_key(|responded| responded.event.date_from);
        Ok(events)
    }

    async fn find_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> StoreResult<Option<Attendance>> {
        let tables = self.tables.read().await;
        Ok(tables
            .attendance
            .get(&(user_id.to_string(), event_id))
            .cloned())
    }

    async fn create_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
        response: AttendanceResponse,
    ) -> StoreResult<Attendance> {
        let mut tables = self.tables.write().await;
        tables.ensure_references(user_id, event_id)?;
        let key = (user_id.to_string(), event_id);
        if tables.attendance.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        let attendance = Attendance {
            user_id: user_id.to_string(),
            event_id,
            response,
            created_at: Utc::now(),
        };
        tables.attendance.insert(key, attendance.clone());
        Ok(attendance)
    }

    async fn update_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
        response: AttendanceResponse,
    ) -> StoreResult<Attendance> {
        let mut tables = self.tables.write().await;
        let attendance = tables
            .attendance
            .get_mut(&(user_id.to_string(), event_id))
            .ok_or(StoreError::NotFound)?;
        attendance.response = response;
        Ok(attendance.clone())
    }

    async fn delete_attendance(&self, user_id: &str, event_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .attendance
            .remove(&(user_id.to_string(), event_id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_attendees(&self, event_id: Uuid) -> StoreResult<Vec<Attendee>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Attendance> = tables
            .attendance
            .values()
            .filter(|attendance| attendance.event_id == event_id)
            .collect();
        rows.sort_by_key(|attendance| attendance.created_at);

        Ok(rows
            .into_iter()
            .filter_map(|attendance| {
                tables.users.get(&attendance.user_id).map(|user| Attendee {
                    user_id: attendance.user_id.clone(),
                    event_id: attendance.event_id,
                    response: attendance.response,
                    full_name: user.full_name.clone(),
                    profile_image_url: user.profile_image_url.clone(),
                })
            })
            .collect())
    }

    async fn create_post(
        &self,
        event_id: Uuid,
        message: &str,
        post_type: PostType,
    ) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event_id) {
            return Err(StoreError::MissingReference);
        }
        let post = Post {
            id: Uuid::new_v4(),
            event_id,
            message: message.to_string(),
            post_type,
            created_at: Utc::now(),
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn update_post_message(&self, id: Uuid, message: &str) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&id).ok_or(StoreError::NotFound)?;
        post.message = message.to_string();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .posts
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list_posts(&self, event_id: Uuid) -> StoreResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .filter(|post| post.event_id == event_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn find_subscription(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> StoreResult<Option<Subscription>> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .get(&(user_id.to_string(), event_id))
            .cloned())
    }

    async fn create_subscription(&self, user_id: &str, event_id: Uuid) -> StoreResult<Subscription> {
        let mut tables = self.tables.write().await;
        tables.ensure_references(user_id, event_id)?;
        let key = (user_id.to_string(), event_id);
        if tables.subscriptions.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        let subscription = Subscription {
            user_id: user_id.to_string(),
            event_id,
            created_at: Utc::now(),
        };
        tables.subscriptions.insert(key, subscription.clone());
        Ok(subscription)
    }

    async fn delete_subscription(&self, user_id: &str, event_id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .subscriptions
            .remove(&(user_id.to_string(), event_id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn subscriber_emails(&self, event_id: Uuid) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        let mut subscriptions: Vec<&Subscription> = tables
            .subscriptions
            .values()
            .filter(|subscription| subscription.event_id == event_id)
            .collect();
        subscriptions.sort_by_key(|subscription| subscription.created_at);

        Ok(subscriptions
            .into_iter()
            .filter_map(|subscription| tables.users.get(&subscription.user_id))
            .map(|user| user.email.clone())
            .collect())
    }

    async fn create_user(&self, profile: UserProfile) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&profile.id) {
            return Err(StoreError::Conflict);
        }
        let user = User {
            full_name: profile.full_name(),
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            profile_image_url: profile.profile_image_url,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_user(&self, profile: UserProfile) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&profile.id)
            .ok_or(StoreError::NotFound)?;
        user.full_name = profile.full_name();
        user.first_name = profile.first_name;
        user.last_name = profile.last_name;
        user.email = profile.email;
        user.profile_image_url = profile.profile_image_url;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(id).is_none() {
            return Err(StoreError::NotFound);
        }
        let hosted: Vec<Uuid> = tables
            .events
            .values()
            .filter(|event| event.host_id == id)
            .map(|event| event.id)
            .collect();
        for event_id in hosted {
            tables.remove_event_cascade(event_id);
        }
        tables.attendance.retain(|(user_id, _), _| user_id != id);
        tables.subscriptions.retain(|(user_id, _), _| user_id != id);
        Ok(())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }
}
