//! Administrator handlers. Guarded by `admin_middleware`.

use crate::{
    app::AppState,
    error::AppError,
    models::withdrawal::{UpdateWithdrawalStatusRequest, Withdrawal},
    services::withdrawal_service,
};
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

/// `GET /api/v1/admin/withdrawals` - every withdrawal, newest first.
pub async fn list_withdrawals(
    State(state): State<AppState>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    let withdrawals = withdrawal_service::list_all_withdrawals(state.store.as_ref()).await?;
    Ok(Json(withdrawals))
}

/// Move a withdrawal through its lifecycle.
///
/// # Endpoint
///
/// `PATCH /api/v1/admin/withdrawals/{id}`
///
/// # Request Body
///
/// ```json
/// {
///   "status": "completed",
///   "transaction_details": {
///     "transaction_id": "UTR123",
///     "date": "2025-01-15",
///     "reference": "NEFT batch 7"
///   }
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: the updated withdrawal
/// - **400**: unknown status, or completing without transaction details
/// - **404**: no such withdrawal
/// - **409**: transition not allowed (e.g. out of a terminal state)
pub async fn update_withdrawal_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWithdrawalStatusRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    let withdrawal = withdrawal_service::update_withdrawal_status(
        state.store.as_ref(),
        id,
        &request.status,
        request.transaction_details,
    )
    .await?;

    Ok(Json(withdrawal))
}
