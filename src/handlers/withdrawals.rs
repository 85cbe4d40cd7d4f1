//! Seller-facing balance and withdrawal handlers.
//!
//! - GET /api/v1/balance - Current balance (reconciled when the cache is empty)
//! - GET /api/v1/withdrawals - Caller's withdrawals, newest first
//! - POST /api/v1/withdrawals - Request a payout
//! - DELETE /api/v1/withdrawals/{id} - Cancel a pending payout

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        account::{BalanceQuery, BalanceResponse},
        withdrawal::{DeleteWithdrawalResponse, Withdrawal, WithdrawalRequest},
    },
    services::{balance_service, withdrawal_service},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Get the balance of the authenticated user.
///
/// # Endpoint
///
/// `GET /api/v1/balance?user_id=<uuid>`
///
/// `user_id` may be omitted. A user id other than the caller's is rejected
/// with 401.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "user_id": "550e8400-...",
///   "balance_minor": 35000,
///   "currency": "INR"
/// }
/// ```
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, AppError> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    if user_id != auth.user_id {
        return Err(AppError::Unauthorized);
    }

    let balance_minor = balance_service::get_user_balance(state.store.as_ref(), user_id).await?;

    Ok(Json(BalanceResponse {
        user_id,
        balance_minor,
        currency: state.currency.clone(),
    }))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    let withdrawals =
        withdrawal_service::list_user_withdrawals(state.store.as_ref(), auth.user_id).await?;
    Ok(Json(withdrawals))
}

/// Request a withdrawal.
///
/// # Request Body
///
/// ```json
/// { "amount_minor": 4000 }
/// ```
///
/// # Response
///
/// - **201 Created**: the pending withdrawal, with its payment method snapshot
/// - **400**: amount is not positive
/// - **422**: insufficient balance, or no payment method saved
pub async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), AppError> {
    let withdrawal = withdrawal_service::request_withdrawal(
        state.store.as_ref(),
        auth.user_id,
        request.amount_minor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// Delete a pending withdrawal and refund it.
///
/// # Response
///
/// - **200 OK**: `{"success": true}`
/// - **401**: caller does not own the withdrawal
/// - **404**: no such withdrawal
/// - **409**: withdrawal is no longer pending
pub async fn delete_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteWithdrawalResponse>, AppError> {
    withdrawal_service::delete_withdrawal(state.store.as_ref(), auth.user_id, id).await?;
    Ok(Json(DeleteWithdrawalResponse { success: true }))
}
