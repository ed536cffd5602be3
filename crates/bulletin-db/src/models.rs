/// Database row types — these map directly to SQLite rows.
/// Distinct from bulletin-types models to keep the DB layer independent.

pub struct UserRow {
    pub username: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub created_at: String,
}
