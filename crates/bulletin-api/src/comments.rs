use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::WithRejection;
use tracing::info;

use bulletin_types::api::CreateCommentRequest;
use bulletin_types::events::PushEvent;
use bulletin_types::models::Comment;

use crate::content;
use crate::error::ApiError;
use crate::middleware::WriteAccess;
use crate::state::{AppState, run_blocking};

pub async fn list_comments(
    State(state): State<AppState>,
    WithRejection(Path(post_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let db = state.clone();
    let comments = run_blocking(move || content::list_comments_for_post(&db.db, post_id)).await?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    WriteAccess(writer): WriteAccess,
    WithRejection(Json(req), _): WithRejection<Json<CreateCommentRequest>, ApiError>,
) -> Result<Json<Comment>, ApiError> {
    let db = state.clone();
    let comment =
        run_blocking(move || content::create_comment(&db.db, req.post_id, &req.content)).await?;

    let delivered = state.hub.publish(PushEvent::NewComment(comment.clone()));
    info!(
        comment_id = comment.id,
        post_id = comment.post_id,
        author = writer.as_ref().map(|c| c.username.as_str()).unwrap_or("anonymous"),
        "Comment created, pushed to {} subscribers",
        delivered
    );

    Ok(Json(comment))
}
