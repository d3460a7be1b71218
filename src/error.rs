//! Error types shared by the store, the domain operations and the routes.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reservation::ReservationAction;

/// Field name -> validation messages, in the shape clients render next to
/// form inputs.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Failures reported by a [`crate::store::Store`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The write collided with a unique constraint. Carries the constraint
    /// name reported by the database.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
}

impl StoreError {
    /// Lift a sqlx error, turning unique-constraint failures into the
    /// structured variant.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        StoreError::Database(err)
    }
}

/// Request-scoped failure. Every variant maps to exactly one HTTP status.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authorization required")]
    Unauthenticated,

    /// Zero rows matched an ownership predicate. Deliberately the same
    /// response as "does not exist".
    #[error("Not found")]
    NotFound,

    #[error("Validation failed")]
    ValidationFailed(FieldErrors),

    #[error("{}", transition_message(.0))]
    TransitionRejected(ReservationAction),

    #[error("Share link is not valid")]
    LinkInvalid,

    #[error("Share link has been deactivated")]
    LinkInactive,

    #[error("Share link has expired")]
    LinkExpired,

    #[error("{0}")]
    Conflict(String),

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn transition_message(action: &ReservationAction) -> &'static str {
    match action {
        ReservationAction::Reserve => "Could not reserve item",
        ReservationAction::Unreserve => "Could not cancel reservation",
    }
}

impl AppError {
    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        AppError::ValidationFailed(fields)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound | AppError::LinkInvalid => StatusCode::NOT_FOUND,
            AppError::ValidationFailed(_) | AppError::TransitionRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::LinkInactive | AppError::LinkExpired => StatusCode::GONE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            AppError::ValidationFailed(fields) => ErrorResponse {
                error: "Validation failed".to_string(),
                message: None,
                fields: Some(fields),
            },
            AppError::Store(e) => {
                tracing::error!(error = %e, "store operation failed");
                ErrorResponse {
                    error: "Database error".to_string(),
                    message: None,
                    fields: None,
                }
            }
            other => ErrorResponse {
                error: other.to_string(),
                message: None,
                fields: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid("query", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::NotFound
    }
}
