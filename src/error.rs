use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::models::QueueStatus;

/// Error taxonomy for the queue core.
///
/// Three groups with distinct handling:
/// - validation errors: bad input, surfaced immediately, never retried;
/// - business rejections: recoverable rule violations, reported with enough
///   context for the caller to decide the next action;
/// - infrastructure failures: transient, the only class eligible for retry.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    // ── Validation ───────────────────────────────────────────────────
    #[error("authentication required")]
    Unauthenticated,

    #[error("salon not found")]
    SalonNotFound,

    #[error("service {0} is not in this salon's catalogue")]
    ServiceNotFound(Uuid),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // ── Business rejections ──────────────────────────────────────────
    #[error("user already holds an active entry in this salon's queue")]
    DuplicateActiveEntry,

    #[error("queue entry not found")]
    NotFound,

    #[error("illegal transition from {from} on {event}")]
    InvalidTransition {
        from: QueueStatus,
        event: &'static str,
    },

    #[error("another customer is already being served")]
    ServiceBayOccupied,

    #[error("no advance-eligible entry in the queue")]
    EmptyQueue,

    // ── Infrastructure ───────────────────────────────────────────────
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl QueueError {
    fn status_code(&self) -> StatusCode {
        match self {
            QueueError::Unauthenticated => StatusCode::UNAUTHORIZED,
            QueueError::SalonNotFound | QueueError::NotFound => StatusCode::NOT_FOUND,
            QueueError::ServiceNotFound(_) | QueueError::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            QueueError::DuplicateActiveEntry
            | QueueError::InvalidTransition { .. }
            | QueueError::ServiceBayOccupied
            | QueueError::EmptyQueue => StatusCode::CONFLICT,
            QueueError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            QueueError::Unauthenticated => "unauthenticated",
            QueueError::SalonNotFound => "salon_not_found",
            QueueError::ServiceNotFound(_) => "service_not_found",
            QueueError::InvalidRequest(_) => "invalid_request",
            QueueError::DuplicateActiveEntry => "duplicate_active_entry",
            QueueError::NotFound => "not_found",
            QueueError::InvalidTransition { .. } => "invalid_transition",
            QueueError::ServiceBayOccupied => "service_bay_occupied",
            QueueError::EmptyQueue => "empty_queue",
            QueueError::Persistence(_) => "transient_failure",
        }
    }
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let QueueError::Persistence(ref e) = self {
            tracing::error!(error = %e, "persistence failure surfaced to client");
        }

        // Transient failures hide internals; everything else carries its
        // reason so clients can drive user-facing messaging.
        let message = match self {
            QueueError::Persistence(_) => "temporary failure, please retry".to_string(),
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_map_to_conflict() {
        assert_eq!(
            QueueError::DuplicateActiveEntry.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            QueueError::ServiceBayOccupied.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            QueueError::InvalidTransition {
                from: QueueStatus::Waiting,
                event: "complete"
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(
            QueueError::Unauthenticated.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            QueueError::SalonNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
    }
}
