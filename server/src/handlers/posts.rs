use axum::extract::State;
use axum::response::Response;

use crate::auth::AuthUser;
use crate::handlers::{IdPath, JsonBody};
use crate::services::posts::{self, PostForm};
use crate::state::AppState;
use crate::store::Store;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn create_post<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(event_id): IdPath,
    JsonBody(form): JsonBody<PostForm>,
) -> Result<Response, AppError> {
    let published = posts::create_post(&state, &user.user_id, event_id, form).await?;
    Ok(created(published, "Post created"))
}

pub async fn list_posts<S: Store>(
    State(state): State<AppState<S>>,
    IdPath(event_id): IdPath,
) -> Result<Response, AppError> {
    let posts = posts::list_posts(&state, event_id).await?;
    Ok(success(posts, "Posts retrieved"))
}

pub async fn update_post<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(post_id): IdPath,
    JsonBody(form): JsonBody<PostForm>,
) -> Result<Response, AppError> {
    let post = posts::update_post(&state, &user.user_id, post_id, form).await?;
    Ok(success(post, "Post updated"))
}

pub async fn delete_post<S: Store>(
    State(state): State<AppState<S>>,
    user: AuthUser,
    IdPath(post_id): IdPath,
) -> Result<Response, AppError> {
    let post = posts::delete_post(&state, &user.user_id, post_id).await?;
    Ok(success(post, "Post deleted"))
}
