use std::sync::Arc;

use tracing::error;

use bulletin_db::Database;
use bulletin_gateway::hub::Hub;

use crate::error::ApiError;
use crate::middleware::WritePolicy;
use crate::token::TokenIssuer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenIssuer,
    pub hub: Hub,
    pub write_policy: WritePolicy,
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn run_blocking<F, T, E>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(Into::into)
}
