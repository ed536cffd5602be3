use std::path::Path;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::services::{ServeDir, ServeFile};

use bulletin_gateway::connection;

use crate::state::AppState;
use crate::{auth, comments, posts};

/// All HTTP routes plus the push channel at `/ws`. Anything unmatched is
/// served from `static_dir`, falling back to its `index.html`.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/comments", post(comments::create_comment))
        .route("/comments/{post_id}", get(comments::list_comments))
        .route("/ws", get(ws_upgrade))
        .fallback_service(spa)
        .with_state(state)
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, hub))
}
