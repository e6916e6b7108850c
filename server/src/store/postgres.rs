use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Attendance, AttendanceResponse, Attendee, Event, EventDraft, Post, PostType, RespondedEvent,
    Subscription, User, UserProfile,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("Migrations run successfully");
        Ok(())
    }
}

fn expect_affected(rows: u64) -> StoreResult<()> {
    if rows == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

impl Store for PgStore {
    async fn create_event(&self, host_id: &str, draft: EventDraft) -> StoreResult<Event> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, title, description, location_address, location_lat,
                                 location_lon, image_url, date_from, date_to, host_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.location_address)
        .bind(draft.location_lat)
        .bind(draft.location_lon)
        .bind(&draft.image_url)
        .bind(draft.date_from)
        .bind(draft.date_to)
        .bind(host_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO attendance (user_id, event_id, response) VALUES ($1, $2, $3)")
            .bind(host_id)
            .bind(event.id)
            .bind(AttendanceResponse::Yes)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, draft: EventDraft) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            "UPDATE events
             SET title = $2, description = $3, location_address = $4, location_lat = $5,
                 location_lon = $6, image_url = $7, date_from = $8, date_to = $9
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.location_address)
        .bind(draft.location_lat)
        .bind(draft.location_lon)
        .bind(&draft.image_url)
        .bind(draft.date_from)
        .bind(draft.date_to)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn set_event_image(&self, id: Uuid, image_url: Option<String>) -> StoreResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            "UPDATE events SET image_url = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn list_hosted_events(&self, host_id: &str) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE host_id = $1 ORDER BY date_from ASC",
        )
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn list_responded_events(&self, user_id: &str) -> StoreResult<Vec<RespondedEvent>> {
        let events = sqlx::query_as::<_, RespondedEvent>(
            "SELECT e.*, a.response
             FROM events e
             INNER JOIN attendance a ON a.event_id = e.id
             WHERE a.user_id = $1 AND e.host_id <> $1
             ORDER BY e.date_from ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn find_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> StoreResult<Option<Attendance>> {
        let attendance = sqlx::query_as::<_, Attendance>(
            "SELECT * FROM attendance WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendance)
    }

    async fn create_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
        response: AttendanceResponse,
    ) -> StoreResult<Attendance> {
        let attendance = sqlx::query_as::<_, Attendance>(
            "INSERT INTO attendance (user_id, event_id, response)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(user_id)
        .bind(event_id)
        .bind(response)
        .fetch_one(&self.pool)
        .await?;
        Ok(attendance)
    }

    async fn update_attendance(
        &self,
        user_id: &str,
        event_id: Uuid,
        response: AttendanceResponse,
    ) -> StoreResult<Attendance> {
        let attendance = sqlx::query_as::<_, Attendance>(
            "UPDATE attendance SET response = $3
             WHERE user_id = $1 AND event_id = $2
             RETURNING *",
        )
        .bind(user_id)
        .bind(event_id)
        .bind(response)
        .fetch_one(&self.pool)
        .await?;
        Ok(attendance)
    }

    async fn delete_attendance(&self, user_id: &str, event_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM attendance WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn list_attendees(&self, event_id: Uuid) -> StoreResult<Vec<Attendee>> {
        let attendees = sqlx::query_as::<_, Attendee>(
            "SELECT a.user_id, a.event_id, a.response, u.full_name, u.profile_image_url
             FROM attendance a
             INNER JOIN users u ON u.id = a.user_id
             WHERE a.event_id = $1
             ORDER BY a.created_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attendees)
    }

    async fn create_post(
        &self,
        event_id: Uuid,
        message: &str,
        post_type: PostType,
    ) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (id, event_id, message, post_type)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(message)
        .bind(post_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn update_post_message(&self, id: Uuid, message: &str) -> StoreResult<Post> {
        let post = sqlx::query_as::<_, Post>(
            "UPDATE posts SET message = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn list_posts(&self, event_id: Uuid) -> StoreResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE event_id = $1 ORDER BY created_at DESC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn find_subscription(
        &self,
        user_id: &str,
        event_id: Uuid,
    ) -> StoreResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 AND event_id = $2",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn create_subscription(&self, user_id: &str, event_id: Uuid) -> StoreResult<Subscription> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (user_id, event_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn delete_subscription(&self, user_id: &str, event_id: Uuid) -> StoreResult<()> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND event_id = $2")
                .bind(user_id)
                .bind(event_id)
                .execute(&self.pool)
                .await?;
        expect_affected(result.rows_affected())
    }

    async fn subscriber_emails(&self, event_id: Uuid) -> StoreResult<Vec<String>> {
        let emails = sqlx::query_scalar::<_, String>(
            "SELECT u.email
             FROM subscriptions s
             INNER JOIN users u ON u.id = s.user_id
             WHERE s.event_id = $1
             ORDER BY s.created_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(emails)
    }

    async fn create_user(&self, profile: UserProfile) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, first_name, last_name, full_name, email, profile_image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(&profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.full_name())
        .bind(&profile.email)
        .bind(&profile.profile_image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, profile: UserProfile) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users
             SET first_name = $2, last_name = $3, full_name = $4, email = $5,
                 profile_image_url = $6
             WHERE id = $1
             RETURNING *",
        )
        .bind(&profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.full_name())
        .bind(&profile.email)
        .bind(&profile.profile_image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        expect_affected(result.rows_affected())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
