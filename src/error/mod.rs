//! Error taxonomy for the billing engine
//!
//! Every failure raised by the loan domain is a [`BusinessError`] carrying one
//! [`ErrorKind`]. The persistence layer wraps those together with storage
//! failures in [`StoreError`], and the HTTP boundary speaks [`ApiError`].

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Closed classification attached to every business failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Internal,
    BadRequest,
    UnprocessableEntity,
    NotFound,
    AlreadyExists,
}

impl ErrorKind {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorKind::Internal => "INTERNAL_ERROR",
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::UnprocessableEntity => "UNPROCESSABLE_ENTITY",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::AlreadyExists => "ALREADY_EXISTS",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        }
    }
}

/// Domain failures raised by the loan and loan payment aggregates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusinessError {
    #[error("loan id cannot be empty")]
    LoanEmptyId,

    #[error("loan user id cannot be empty")]
    LoanEmptyUserId,

    #[error("loan amount must be greater than zero")]
    LoanInvalidAmount,

    #[error("loan payment duration must be at least 1 week")]
    LoanInvalidPaymentDurationWeeks,

    #[error("loan payment amount must be greater than zero")]
    LoanInvalidPaymentAmount,

    #[error("invalid loan status")]
    LoanInvalidStatus,

    #[error("created at cannot be empty")]
    LoanEmptyCreatedAt,

    #[error("updated at cannot be empty")]
    LoanEmptyUpdatedAt,

    #[error("user still has ongoing loan")]
    StillHasOngoingLoan,

    #[error("loan not found")]
    LoanNotFound,

    #[error("current week is already paid")]
    CurrentWeekAlreadyPaid,

    #[error("loan payment amount does not match billing amount")]
    NotExactPaymentAmount,

    #[error("loan payment id cannot be empty")]
    PaymentEmptyId,

    #[error("loan payment loan id cannot be empty")]
    PaymentEmptyLoanId,

    #[error("loan payment amount must be greater than zero")]
    PaymentInvalidAmount,

    #[error("created at cannot be empty")]
    PaymentEmptyCreatedAt,

    #[error("updated at cannot be empty")]
    PaymentEmptyUpdatedAt,

    #[error("unexpected error, please try again")]
    Unexpected,
}

impl BusinessError {
    /// Classification used for boundary mapping
    pub fn kind(&self) -> ErrorKind {
        match self {
            BusinessError::LoanEmptyId
            | BusinessError::LoanEmptyUserId
            | BusinessError::LoanInvalidAmount
            | BusinessError::LoanInvalidPaymentDurationWeeks
            | BusinessError::LoanInvalidPaymentAmount
            | BusinessError::LoanInvalidStatus
            | BusinessError::LoanEmptyCreatedAt
            | BusinessError::LoanEmptyUpdatedAt
            | BusinessError::PaymentEmptyId
            | BusinessError::PaymentEmptyLoanId
            | BusinessError::PaymentInvalidAmount
            | BusinessError::PaymentEmptyCreatedAt
            | BusinessError::PaymentEmptyUpdatedAt => ErrorKind::BadRequest,
            BusinessError::StillHasOngoingLoan
            | BusinessError::CurrentWeekAlreadyPaid
            | BusinessError::NotExactPaymentAmount => ErrorKind::UnprocessableEntity,
            BusinessError::LoanNotFound => ErrorKind::NotFound,
            BusinessError::Unexpected => ErrorKind::Internal,
        }
    }
}

/// Failures surfaced by a [`crate::loan::LoanRepository`]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Transaction deadline exceeded after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{source}; rollback failed: {rollback}")]
    Rollback {
        source: Box<StoreError>,
        rollback: sqlx::Error,
    },
}

impl StoreError {
    /// Business error carried by this failure, looking through a failed rollback
    pub fn business(&self) -> Option<&BusinessError> {
        match self {
            StoreError::Business(err) => Some(err),
            StoreError::Rollback { source, .. } => source.business(),
            _ => None,
        }
    }

    /// Whether the store aborted the transaction to keep a serial history.
    ///
    /// Callers may retry the whole workflow when this returns true.
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db_err)) => {
                matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
            }
            StoreError::Rollback { source, .. } => source.is_serialization_failure(),
            _ => false,
        }
    }
}

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Business(#[from] BusinessError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Business(err) => err.kind().error_code(),
            ApiError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ApiError::Unknown(_) => "UNKNOWN",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Business(err) => err.kind().status_code(),
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, code = %error_code, "Server error occurred");
        } else {
            tracing::debug!(error = %message, code = %error_code, "Client error occurred");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<BusinessError>() {
            Ok(business) => ApiError::Business(business),
            Err(other) => ApiError::Unknown(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidArgument(rejection.body_text())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_bad_request() {
        for err in [
            BusinessError::LoanEmptyId,
            BusinessError::LoanEmptyUserId,
            BusinessError::LoanInvalidAmount,
            BusinessError::LoanInvalidPaymentDurationWeeks,
            BusinessError::LoanEmptyCreatedAt,
            BusinessError::PaymentInvalidAmount,
            BusinessError::PaymentEmptyLoanId,
        ] {
            assert_eq!(err.kind(), ErrorKind::BadRequest, "{err}");
        }
    }

    #[test]
    fn test_business_rule_kinds() {
        assert_eq!(
            BusinessError::StillHasOngoingLoan.kind(),
            ErrorKind::UnprocessableEntity
        );
        assert_eq!(
            BusinessError::CurrentWeekAlreadyPaid.kind(),
            ErrorKind::UnprocessableEntity
        );
        assert_eq!(
            BusinessError::NotExactPaymentAmount.kind(),
            ErrorKind::UnprocessableEntity
        );
        assert_eq!(BusinessError::LoanNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(BusinessError::Unexpected.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(BusinessError::Unexpected).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(BusinessError::LoanInvalidAmount).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(BusinessError::NotExactPaymentAmount).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(BusinessError::LoanNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ErrorKind::AlreadyExists.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Unknown("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::InvalidArgument("invalid user id".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::from(BusinessError::LoanNotFound).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(ApiError::Unknown(String::new()).error_code(), "UNKNOWN");
        assert_eq!(ErrorKind::AlreadyExists.error_code(), "ALREADY_EXISTS");
    }

    #[test]
    fn test_store_error_finds_business_error_behind_rollback() {
        let err = StoreError::Rollback {
            source: Box::new(StoreError::Business(BusinessError::StillHasOngoingLoan)),
            rollback: sqlx::Error::PoolClosed,
        };

        assert_eq!(err.business(), Some(&BusinessError::StillHasOngoingLoan));
        assert!(err.to_string().contains("user still has ongoing loan"));
        assert!(err.to_string().contains("rollback failed"));
    }

    #[test]
    fn test_raw_database_error_is_not_business() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.business().is_none());
        assert!(!err.is_serialization_failure());
    }

    #[test]
    fn test_anyhow_conversion_keeps_classification() {
        let classified = ApiError::from(anyhow::Error::new(BusinessError::LoanNotFound));
        assert_eq!(classified.status_code(), StatusCode::NOT_FOUND);

        let unclassified = ApiError::from(anyhow::anyhow!("socket closed"));
        assert_eq!(unclassified.error_code(), "UNKNOWN");
    }
}
