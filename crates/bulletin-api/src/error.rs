use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use bulletin_db::StoreError;
use bulletin_types::api::ErrorResponse;

use crate::content::ContentError;
use crate::credentials::CredentialError;

/// Errors a handler can return. Client-facing messages are generic; details
/// stay in the server log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(reason) => (StatusCode::BAD_REQUEST, *reason),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid credentials"),
            Self::Store(e) => {
                error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        Self::Validation("malformed request body")
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        debug!("Rejected path parameter: {}", rejection.body_text());
        Self::Validation("malformed path parameter")
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Invalid(reason) => Self::Validation(reason),
            ContentError::Store(e) => Self::Store(e),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            // Same message as any other rejected registration
            CredentialError::DuplicateUser => Self::Validation("registration failed"),
            CredentialError::Hash(e) => {
                warn!("Password hashing failed: {}", e);
                Self::Internal
            }
            CredentialError::Store(e) => Self::Store(e),
        }
    }
}
