use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{attendance, events, health_check, posts, subscriptions, users};
use crate::state::AppState;
use crate::store::Store;

pub fn create_routes<S: Store>(state: AppState<S>) -> Router {
    let security = create_security_headers_layer(&state.config);
    let cors = create_cors_layer(&state.config);

    let api = Router::new()
        .route("/dashboard", get(events::dashboard::<S>))
        .route("/events", post(events::create_event::<S>))
        .route(
            "/events/:id",
            get(events::get_event::<S>)
                .put(events::update_event::<S>)
                .delete(events::delete_event::<S>),
        )
        .route(
            "/events/:id/image",
            put(events::set_event_image::<S>).delete(events::clear_event_image::<S>),
        )
        .route(
            "/events/:id/attendance",
            get(attendance::list_attendance::<S>).put(attendance::respond::<S>),
        )
        .route(
            "/events/:id/posts",
            get(posts::list_posts::<S>).post(posts::create_post::<S>),
        )
        .route(
            "/events/:id/subscription",
            get(subscriptions::subscription_status::<S>)
                .post(subscriptions::toggle_subscription::<S>),
        )
        .route(
            "/posts/:id",
            put(posts::update_post::<S>).delete(posts::delete_post::<S>),
        )
        .route("/users/:id", get(users::get_user::<S>))
        .route("/webhooks/identity", post(users::identity_webhook::<S>));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(security)
        .layer(cors)
}
