use serde::{Deserialize, Serialize};

use crate::models::{Comment, Post};

/// Events pushed to every connected subscriber over the WebSocket channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// A post was committed
    NewPost(Post),

    /// A comment was committed
    NewComment(Comment),
}

impl PushEvent {
    /// Wire name of the event, as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewPost(_) => "new_post",
            Self::NewComment(_) => "new_comment",
        }
    }
}
