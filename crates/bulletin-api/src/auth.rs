use axum::{Json, extract::State};
use axum_extra::extract::WithRejection;
use tracing::{error, info, warn};

use bulletin_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, SessionClaims};

use crate::credentials::{self, CredentialError};
use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

const MAX_USERNAME_LEN: usize = 64;
const MAX_PASSWORD_LEN: usize = 1024;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<Json<RegisterResponse>, ApiError> {
    // Validate input
    let username = req.username.trim().to_string();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::Validation("registration failed"));
    }
    if req.password.is_empty() || req.password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::Validation("registration failed"));
    }

    let db = state.clone();
    let name = username.clone();
    run_blocking(move || {
        credentials::create_user(&db.db, &name, &req.password).inspect_err(|e| {
            if matches!(e, CredentialError::DuplicateUser) {
                warn!("Registration rejected: username taken");
            }
        })
    })
    .await?;

    info!("Registered user {}", username);
    Ok(Json(RegisterResponse {
        message: "registration complete".to_string(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<LoginResponse>, ApiError> {
    let db = state.clone();
    let username = req.username.trim().to_string();
    let verified = run_blocking(move || credentials::verify_user(&db.db, &username, &req.password))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let token = state
        .tokens
        .issue(&SessionClaims {
            username: verified.clone(),
        })
        .map_err(|e| {
            error!("Token signing failed: {}", e);
            ApiError::Internal
        })?;

    info!("{} logged in", verified);
    Ok(Json(LoginResponse { token }))
}
