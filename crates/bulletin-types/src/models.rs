use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published post. `id` is assigned by the store and orders posts by creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment attached to a post. `post_id` is not checked against existing posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
