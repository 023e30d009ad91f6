use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{game::TransitionError, session_store::SessionError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The game rules refused the request.
    #[error(transparent)]
    Rejected(TransitionError),
    /// The request broke a precondition the caller is expected to uphold.
    #[error("contract violation: {0}")]
    ContractViolation(#[source] TransitionError),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
    /// Stored data could not be read or written back.
    #[error("internal error")]
    Internal(#[source] SessionError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotInstalled => ServiceError::Degraded,
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Transition(inner) if inner.is_contract_violation() => {
                ServiceError::ContractViolation(inner)
            }
            SessionError::Transition(inner) => ServiceError::Rejected(inner),
            SessionError::GameNotFound(game_id) => {
                ServiceError::NotFound(format!("game `{game_id}` not found"))
            }
            SessionError::Busy(_) => ServiceError::Timeout,
            SessionError::Storage(source) => source.into(),
            other @ (SessionError::Corrupt { .. }
            | SessionError::Encode { .. }
            | SessionError::IdCollision) => ServiceError::Internal(other),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Rejected(inner) => AppError::Conflict(inner.to_string()),
            ServiceError::ContractViolation(inner) => AppError::BadRequest(inner.to_string()),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
            ServiceError::Internal(source) => AppError::Internal(source.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_map_to_service_categories() {
        assert!(matches!(
            ServiceError::from(SessionError::Transition(TransitionError::GameFull)),
            ServiceError::Rejected(TransitionError::GameFull)
        ));
        assert!(matches!(
            ServiceError::from(SessionError::Transition(TransitionError::NotFinished)),
            ServiceError::ContractViolation(TransitionError::NotFinished)
        ));
        assert!(matches!(
            ServiceError::from(SessionError::Busy("g1".into())),
            ServiceError::Timeout
        ));
        assert!(matches!(
            ServiceError::from(SessionError::Storage(StorageError::NotInstalled)),
            ServiceError::Degraded
        ));
        assert!(matches!(
            ServiceError::from(SessionError::IdCollision),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::Rejected(TransitionError::GameOver),
                StatusCode::CONFLICT,
            ),
            (ServiceError::Degraded, StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
