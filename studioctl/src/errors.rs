use crate::db::errors::DbError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Actor lacks the required role for the operation
    #[error("Insufficient permissions to {action}")]
    Forbidden { action: String },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested entity missing, or not owned by the acting account
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: &'static str, id: String },

    /// Non-positive quantity where a positive one is required
    #[error("{message}")]
    InvalidAmount { message: String },

    /// Active balance (or lot balance) cannot cover the requested amount
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },

    /// Requested interval overlaps a pending or confirmed reservation
    #[error("Requested slot is already reserved")]
    SlotConflict,

    /// Cancellation attempted on an already-cancelled reservation
    #[error("Reservation is already cancelled")]
    AlreadyCancelled,

    /// Cancellation attempted on a completed reservation
    #[error("Completed reservations cannot be cancelled")]
    AlreadyCompleted,

    /// Approval attempted on a reservation that is not pending
    #[error("Reservation is not pending approval")]
    NotPending,

    /// Credit transfer where source and destination are the same account
    #[error("Cannot transfer credits to the same account")]
    SameAccount,

    /// Lot-scoped operation on an inactive or expired lot
    #[error("Credit lot is inactive or expired")]
    LotInactiveOrExpired,

    /// Storage operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } | Error::InvalidAmount { .. } | Error::SameAccount => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            Error::SlotConflict
            | Error::AlreadyCancelled
            | Error::AlreadyCompleted
            | Error::NotPending
            | Error::LotInactiveOrExpired => StatusCode::CONFLICT,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, part of the API contract.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated { .. } => "unauthenticated",
            Error::Forbidden { .. } => "forbidden",
            Error::BadRequest { .. } => "bad_request",
            Error::NotFound { .. } => "not_found",
            Error::InvalidAmount { .. } => "invalid_amount",
            Error::InsufficientCredits { .. } => "insufficient_credits",
            Error::SlotConflict => "slot_conflict",
            Error::AlreadyCancelled => "already_cancelled",
            Error::AlreadyCompleted => "already_completed",
            Error::NotPending => "not_pending",
            Error::SameAccount => "same_account",
            Error::LotInactiveOrExpired => "lot_inactive_or_expired",
            Error::Database(DbError::NotFound) => "not_found",
            Error::Database(DbError::Other(_)) | Error::Other(_) => "internal_error",
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::Database(DbError::NotFound) => "Resource not found".to_string(),
            Error::Database(DbError::Other(_)) | Error::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthenticated { .. } | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::SlotConflict | Error::InsufficientCredits { .. } => {
                tracing::debug!("Rejected operation: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = json!({
            "code": self.code(),
            "message": self.user_message(),
        });

        (self.status_code(), axum::response::Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::SlotConflict.code(), "slot_conflict");
        assert_eq!(Error::SameAccount.code(), "same_account");
        assert_eq!(
            Error::InsufficientCredits { required: 6, available: 0 }.code(),
            "insufficient_credits"
        );
        assert_eq!(Error::Database(DbError::NotFound).code(), "not_found");
    }

    #[test]
    fn storage_detail_does_not_leak() {
        let err = Error::Database(DbError::Other(anyhow::anyhow!("lock poisoned at store.rs:42")));
        assert_eq!(err.user_message(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
