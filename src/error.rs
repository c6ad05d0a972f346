// region:    --- Imports
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::store::StoreError;

// endregion: --- Imports

// region:    --- Bet Error
/// Per-request failures of the bidding engine. None of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum BetError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("bidding is closed for job {0}")]
    JobNotActive(Uuid),
    #[error("not eligible for this job: {0}")]
    Eligibility(String),
    #[error("bid {0} not found for this job")]
    BidNotFound(Uuid),
    #[error("job {0} not found")]
    JobNotFound(Uuid),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job {0} is being modified concurrently, retry later")]
    Contention(Uuid),
}

impl BetError {
    /// Stable machine-readable code returned alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            BetError::Validation(_) => "VALIDATION",
            BetError::InvalidState(_) => "INVALID_STATE",
            BetError::JobNotActive(_) => "JOB_NOT_ACTIVE",
            BetError::Eligibility(_) => "NOT_ELIGIBLE",
            BetError::BidNotFound(_) => "BID_NOT_FOUND",
            BetError::JobNotFound(_) => "JOB_NOT_FOUND",
            BetError::Store(_) => "STORE",
            BetError::Contention(_) => "CONTENTION",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BetError::Validation(_) => StatusCode::BAD_REQUEST,
            BetError::InvalidState(_) | BetError::JobNotActive(_) => StatusCode::CONFLICT,
            BetError::Eligibility(_) => StatusCode::FORBIDDEN,
            BetError::BidNotFound(_) | BetError::JobNotFound(_) => StatusCode::NOT_FOUND,
            BetError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BetError::Contention(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// Malformed bodies and ids are caller errors like any other validation failure.
impl From<JsonRejection> for BetError {
    fn from(rejection: JsonRejection) -> Self {
        BetError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for BetError {
    fn from(rejection: PathRejection) -> Self {
        BetError::Validation(rejection.body_text())
    }
}

impl IntoResponse for BetError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status_code(), body).into_response()
    }
}
// endregion: --- Bet Error
