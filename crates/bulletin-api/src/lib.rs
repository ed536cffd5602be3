pub mod auth;
pub mod comments;
pub mod content;
pub mod credentials;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod router;
pub mod state;
pub mod token;
