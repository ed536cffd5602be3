use axum::{Json, extract::State};
use axum_extra::extract::WithRejection;
use tracing::info;

use bulletin_types::api::CreatePostRequest;
use bulletin_types::events::PushEvent;
use bulletin_types::models::Post;

use crate::content;
use crate::error::ApiError;
use crate::middleware::WriteAccess;
use crate::state::{AppState, run_blocking};

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    let db = state.clone();
    let posts = run_blocking(move || content::list_posts(&db.db)).await?;
    Ok(Json(posts))
}

/// Commit the post, then fan it out. The broadcast only ever carries the
/// stored record.
pub async fn create_post(
    State(state): State<AppState>,
    WriteAccess(writer): WriteAccess,
    WithRejection(Json(req), _): WithRejection<Json<CreatePostRequest>, ApiError>,
) -> Result<Json<Post>, ApiError> {
    let db = state.clone();
    let post = run_blocking(move || content::create_post(&db.db, &req.title, &req.content)).await?;

    let delivered = state.hub.publish(PushEvent::NewPost(post.clone()));
    info!(
        post_id = post.id,
        author = writer.as_ref().map(|c| c.username.as_str()).unwrap_or("anonymous"),
        "Post created, pushed to {} subscribers",
        delivered
    );

    Ok(Json(post))
}
