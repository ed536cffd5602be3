mod config;

use std::sync::Arc;

use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bulletin_api::router::router;
use bulletin_api::state::{AppState, AppStateInner};
use bulletin_api::token::TokenIssuer;
use bulletin_db::Database;
use bulletin_gateway::hub::Hub;

use crate::config::{Config, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_placeholder_secret() {
        warn!("BULLETIN_JWT_SECRET is unset or a placeholder; tokens are forgeable. Set it before deploying.");
    }

    // Init database
    let db = Database::open(&config.db_path)?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        tokens: TokenIssuer::new(&config.jwt_secret, config.token_ttl),
        hub: Hub::with_buffer(config.subscriber_buffer),
        write_policy: config.write_policy,
    });

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = router(app_state, &config.static_dir)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = config.listen_addr()?;
    info!("Bulletin server listening on {}", addr);
    info!(
        "Write policy: {}, token expiry: {}",
        config.write_policy,
        config
            .token_ttl
            .map(|ttl| format!("{}h", ttl.as_secs() / 3600))
            .unwrap_or_else(|| "none".into())
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
