//! Unified error taxonomy for the API.
//!
//! Every fallible path in the crate funnels into [`ApiError`], which maps onto
//! an HTTP status and a JSON `{"errors": [...]}` body. Nothing in here is
//! retried; a failure is terminal for its request.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// ApiError
///
/// The full error taxonomy of the service:
/// - `Validation`: malformed or forbidden field values. May carry several
///   field-level messages at once (e.g. both halves of a username/email
///   pairing conflict).
/// - `Conflict`: an attempted write that violates a uniqueness invariant
///   (duplicate review, username/email pairing). The database constraint is
///   the source of truth; application pre-checks only improve the message.
/// - `Unauthorized`: missing, malformed or expired credentials.
/// - `Forbidden`: authenticated but lacking the role or ownership required.
/// - `NotFound`: missing entity, including cross-parent mismatches which are
///   deliberately indistinguishable from absence.
/// - `Delivery`: the outbound mailer failed. Never masked as validation.
/// - `Database`: an unexpected storage failure; details stay in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<String>),

    #[error("conflict")]
    Conflict(Vec<String>),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    /// Convenience constructor for a single-message validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(vec![msg.into()])
    }

    /// Convenience constructor for a single-message conflict.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(vec![msg.into()])
    }
}

/// JSON body sent with every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    errors: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match self {
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, errors),
            Self::Conflict(errors) => (StatusCode::BAD_REQUEST, errors),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                vec!["authentication required".to_string()],
            ),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                vec!["insufficient permissions".to_string()],
            ),
            Self::NotFound => (StatusCode::NOT_FOUND, vec!["not found".to_string()]),
            Self::Delivery(reason) => {
                tracing::error!("mail delivery failed: {reason}");
                (
                    StatusCode::BAD_GATEWAY,
                    vec!["failed to deliver confirmation email".to_string()],
                )
            }
            Self::Database(e) => {
                // Log the real cause, return an opaque message.
                tracing::error!("database error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec!["internal server error".to_string()],
                )
            }
        };

        (status, Json(ErrorBody { errors })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let resp = ApiError::validation("bad field").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_maps_to_400() {
        let resp = ApiError::conflict("duplicate").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn delivery_maps_to_502_not_400() {
        let resp = ApiError::Delivery("smtp down".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
