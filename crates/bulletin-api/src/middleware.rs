use std::fmt;
use std::str::FromStr;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use bulletin_types::api::SessionClaims;

use crate::error::ApiError;
use crate::state::AppState;

/// Who may call the write endpoints (`POST /posts`, `POST /comments`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Anyone may write; a bearer token is optional.
    #[default]
    Public,
    /// A valid bearer token is required.
    Authenticated,
}

impl FromStr for WritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "authenticated" => Ok(Self::Authenticated),
            other => Err(format!(
                "unknown write policy '{}' (expected 'public' or 'authenticated')",
                other
            )),
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// Caller identity for write endpoints, enforced per [`WritePolicy`].
///
/// A presented token must be valid under either policy; only its absence is
/// tolerated, and only when writes are public.
#[derive(Debug, Clone)]
pub struct WriteAccess(pub Option<SessionClaims>);

impl FromRequestParts<AppState> for WriteAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return match state.write_policy {
                WritePolicy::Public => Ok(Self(None)),
                WritePolicy::Authenticated => Err(ApiError::Unauthorized),
            };
        }

        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(ApiError::Unauthorized)?;

        let claims = state
            .tokens
            .verify(bearer.token())
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self(Some(claims)))
    }
}
