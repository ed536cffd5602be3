use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use bulletin_db::models::{CommentRow, PostRow};
use bulletin_db::{Database, StoreError};
use bulletin_types::models::{Comment, Post};

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn create_post(db: &Database, title: &str, content: &str) -> Result<Post, ContentError> {
    if title.trim().is_empty() {
        return Err(ContentError::Invalid("title must not be empty"));
    }
    if content.trim().is_empty() {
        return Err(ContentError::Invalid("content must not be empty"));
    }

    Ok(post_from_row(db.insert_post(title, content)?))
}

/// Snapshot of all posts, newest first.
pub fn list_posts(db: &Database) -> Result<Vec<Post>, StoreError> {
    Ok(db.list_posts()?.into_iter().map(post_from_row).collect())
}

/// `post_id` is stored as given, even if no such post exists.
pub fn create_comment(db: &Database, post_id: i64, content: &str) -> Result<Comment, ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::Invalid("content must not be empty"));
    }

    Ok(comment_from_row(db.insert_comment(post_id, content)?))
}

pub fn list_comments_for_post(db: &Database, post_id: i64) -> Result<Vec<Comment>, StoreError> {
    Ok(db
        .list_comments(post_id)?
        .into_iter()
        .map(comment_from_row)
        .collect())
}

fn post_from_row(row: PostRow) -> Post {
    Post {
        created_at: parse_timestamp(&row.created_at, "post", row.id),
        id: row.id,
        title: row.title,
        content: row.content,
    }
}

fn comment_from_row(row: CommentRow) -> Comment {
    Comment {
        created_at: parse_timestamp(&row.created_at, "comment", row.id),
        id: row.id,
        post_id: row.post_id,
        content: row.content,
    }
}

fn parse_timestamp(raw: &str, kind: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand via sqlite3 use "YYYY-MM-DD HH:MM:SS" without timezone.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {} {}: {}", raw, kind, id, e);
            DateTime::default()
        })
}
