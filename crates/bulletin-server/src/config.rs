use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use bulletin_api::middleware::WritePolicy;
use bulletin_gateway::hub::DEFAULT_SUBSCRIBER_BUFFER;

/// Placeholder JWT secrets that must not be used outside local development.
pub const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me-to-a-random-string"];

/// Log filter used when `RUST_LOG` is unset. Every workspace crate logs at
/// debug; dependencies stay at info.
pub const DEFAULT_LOG_FILTER: &str =
    "info,bulletin=debug,bulletin_api=debug,bulletin_db=debug,bulletin_gateway=debug,tower_http=debug";

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Runtime settings. No `Debug`: it would print the signing secret.
#[derive(Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub token_ttl: Option<Duration>,
    pub write_policy: WritePolicy,
    pub allowed_origins: Vec<String>,
    pub subscriber_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take local-development defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = var("BULLETIN_PORT", "3000")
            .parse()
            .context("BULLETIN_PORT must be a port number")?;

        let token_ttl = lookup("BULLETIN_TOKEN_TTL_HOURS")
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_ttl_hours(&v))
            .transpose()?;

        let write_policy = var("BULLETIN_WRITE_POLICY", "public")
            .parse::<WritePolicy>()
            .map_err(anyhow::Error::msg)
            .context("BULLETIN_WRITE_POLICY")?;

        let allowed_origins = var("BULLETIN_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let subscriber_buffer: usize = var("BULLETIN_SUBSCRIBER_BUFFER", &DEFAULT_SUBSCRIBER_BUFFER.to_string())
            .parse()
            .context("BULLETIN_SUBSCRIBER_BUFFER must be a positive integer")?;
        if subscriber_buffer == 0 {
            bail!("BULLETIN_SUBSCRIBER_BUFFER must be a positive integer");
        }

        Ok(Self {
            db_path: var("BULLETIN_DB_PATH", "bulletin.db").into(),
            jwt_secret: var("BULLETIN_JWT_SECRET", "dev-secret-change-me"),
            host: var("BULLETIN_HOST", "0.0.0.0"),
            port,
            static_dir: var("BULLETIN_STATIC_DIR", "public").into(),
            token_ttl,
            write_policy,
            allowed_origins,
            subscriber_buffer,
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

fn parse_ttl_hours(raw: &str) -> Result<Duration> {
    let hours: u64 = raw
        .trim()
        .parse()
        .context("BULLETIN_TOKEN_TTL_HOURS must be a whole number of hours")?;
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .context("BULLETIN_TOKEN_TTL_HOURS is too large")
}
