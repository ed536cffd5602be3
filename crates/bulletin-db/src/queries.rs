use crate::models::{CommentRow, PostRow, UserRow};
use crate::{Database, StoreError};
use rusqlite::{Connection, OptionalExtension, Row, ffi};

impl Database {
    // -- Users --

    /// Insert a user row. A taken username yields [`StoreError::Duplicate`],
    /// including when two registrations race past any earlier lookup.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            )
            .map_err(map_unique_violation)?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Posts --

    /// Insert a post and return the stored row. Id assignment and insert are
    /// one statement, so no two callers can observe the same id.
    pub fn insert_post(&self, title: &str, content: &str) -> Result<PostRow, StoreError> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO posts (title, content) VALUES (?1, ?2)
                 RETURNING id, title, content, created_at",
                (title, content),
                post_from_row,
            )?;
            Ok(row)
        })
    }

    /// All posts, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, created_at FROM posts ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map([], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, post_id: i64, content: &str) -> Result<CommentRow, StoreError> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO comments (post_id, content) VALUES (?1, ?2)
                 RETURNING id, post_id, content, created_at",
                rusqlite::params![post_id, content],
                comment_from_row,
            )?;
            Ok(row)
        })
    }

    /// Comments on a post in creation order. Unknown posts simply have none.
    pub fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, post_id, content, created_at FROM comments
                 WHERE post_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([post_id], comment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Only key collisions are duplicates; NOT NULL, CHECK and other
/// constraint failures stay plain SQLite errors.
fn map_unique_violation(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            StoreError::Duplicate
        }
        other => StoreError::Sqlite(other),
    }
}
