//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Precondition violations**: `InsufficientBalance`, `NoPaymentMethod`,
///   `InvalidState`, `InvalidStatus`, `InvalidAmount`, `InvalidRequest`.
///   Raised before anything is written.
/// - **Authorization**: `Unauthorized`
/// - **Resource errors**: `NotFound`
/// - **Payment errors**: `PaymentVerification`, `Gateway`
/// - **Storage errors**: `Database`. The atomic unit was aborted as a whole,
///   so the caller may retry the entire operation.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, aborted commit).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Missing or invalid credentials, or the caller does not own the resource.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// Requested resource does not exist. The payload names the resource.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Account balance cannot cover the requested withdrawal.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient balance")]
    InsufficientBalance,

    /// Withdrawal requested before any payout destination was saved.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("No payment method found. Please add a payment method in your profile settings.")]
    NoPaymentMethod,

    /// The withdrawal is not in a state that allows the requested change.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    InvalidState(String),

    /// Unrecognized withdrawal status value.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Amount is zero, negative, or not a well-formed integer.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Gateway signature did not match or the gateway rejected the payment.
    ///
    /// The detail is logged, never sent to the client.
    #[error("Payment verification failed: {0}")]
    PaymentVerification(String),

    /// The payment gateway could not be reached or answered with an error.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] reqwest::Error),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::NoPaymentMethod => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "no_payment_method",
                self.to_string(),
            ),
            AppError::InvalidState(ref msg) => (StatusCode::CONFLICT, "invalid_state", msg.clone()),
            AppError::InvalidStatus(_) => {
                (StatusCode::BAD_REQUEST, "invalid_status", self.to_string())
            }
            AppError::InvalidAmount(_) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", self.to_string())
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::PaymentVerification(ref detail) => {
                tracing::warn!("Payment verification failed: {}", detail);
                (
                    StatusCode::BAD_REQUEST,
                    "payment_verification_failed",
                    "Payment verification failed".to_string(),
                )
            }
            AppError::Gateway(ref e) => {
                tracing::error!("Payment gateway error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "payment_verification_failed",
                    "Payment verification failed".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
