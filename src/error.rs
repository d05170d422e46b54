//! Error types for the Athenaeum server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::loan::{LoanAction, LoanStatus};

/// Application error codes exposed in error response bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchMember = 4,
    NoSuchBook = 5,
    NoSuchLoan = 6,
    BookNotAvailable = 7,
    MaxLoansReached = 8,
    DuplicateLoan = 9,
    WrongLoanState = 10,
    MemberNotActive = 11,
    BadValue = 12,
    Duplicate = 13,
    BookInUse = 14,
    MemberHasIssuedBooks = 15,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Book {0} not found")]
    BookNotFound(i32),

    #[error("Member {0} not found")]
    MemberNotFound(i32),

    #[error("Loan {0} not found")]
    LoanNotFound(i32),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    // Workflow business-rule violations. These are expected, user-facing
    // outcomes of a transition attempt, not program faults.
    #[error("No copies of book {0} are available")]
    BookUnavailable(i32),

    #[error("Member {member_id} already holds {current} issued books (limit {max})")]
    LoanLimitReached {
        member_id: i32,
        current: i64,
        max: i64,
    },

    #[error("Member {member_id} already holds an issued copy of book {book_id}")]
    DuplicateLoan { member_id: i32, book_id: i32 },

    #[error("Cannot {action} a loan in state '{status}'")]
    InvalidTransition {
        status: LoanStatus,
        action: LoanAction,
    },

    #[error("Member {0} is not active")]
    MemberInactive(i32),

    #[error("Loan {loan_id} does not belong to member {member_id}")]
    NotLoanOwner { loan_id: i32, member_id: i32 },

    #[error("Book {0} has active loans and cannot be removed")]
    BookHasActiveLoans(i32),

    #[error("Member {0} still holds issued books")]
    MemberHoldsBooks(i32),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl AppError {
    fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) | AppError::Authorization(_) => ErrorCode::NotAuthorized,
            AppError::BookNotFound(_) => ErrorCode::NoSuchBook,
            AppError::MemberNotFound(_) => ErrorCode::NoSuchMember,
            AppError::LoanNotFound(_) => ErrorCode::NoSuchLoan,
            AppError::Validation(_) => ErrorCode::BadValue,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Internal(_) => ErrorCode::Failure,
            AppError::BookUnavailable(_) => ErrorCode::BookNotAvailable,
            AppError::LoanLimitReached { .. } => ErrorCode::MaxLoansReached,
            AppError::DuplicateLoan { .. } => ErrorCode::DuplicateLoan,
            AppError::InvalidTransition { .. } => ErrorCode::WrongLoanState,
            AppError::MemberInactive(_) => ErrorCode::MemberNotActive,
            AppError::NotLoanOwner { .. } => ErrorCode::NotAuthorized,
            AppError::BookHasActiveLoans(_) => ErrorCode::BookInUse,
            AppError::MemberHoldsBooks(_) => ErrorCode::MemberHasIssuedBooks,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) | AppError::NotLoanOwner { .. } => StatusCode::FORBIDDEN,
            AppError::BookNotFound(_) | AppError::MemberNotFound(_) | AppError::LoanNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BookUnavailable(_)
            | AppError::LoanLimitReached { .. }
            | AppError::DuplicateLoan { .. }
            | AppError::InvalidTransition { .. }
            | AppError::MemberInactive(_)
            | AppError::BookHasActiveLoans(_)
            | AppError::MemberHoldsBooks(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = self.status();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
