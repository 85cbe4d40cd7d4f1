//! Payment method handlers.
//!
//! - GET /api/v1/payment-method - Live payout destination (`null` if none)
//! - PUT /api/v1/payment-method - Create or replace it
//! - GET /api/v1/payment-method/history - Every saved version, newest first

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::payment_method::{
        PaymentDetails, PaymentMethod, PaymentMethodHistory, UpsertPaymentMethodRequest,
    },
    services::payment_method_service,
};
use axum::{Extension, Json, extract::State};

pub async fn get_payment_method(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Option<PaymentMethod>>, AppError> {
    let method =
        payment_method_service::get_payment_method(state.store.as_ref(), auth.user_id).await?;
    Ok(Json(method))
}

/// Save the caller's payout destination.
///
/// # Request Body
///
/// ```json
/// {
///   "type": "bank",
///   "details": {
///     "account_number": "001234567890",
///     "account_name": "Asha Rao",
///     "bank_name": "State Bank",
///     "ifsc_code": "SBIN0001234"
///   },
///   "is_default": true
/// }
/// ```
pub async fn upsert_payment_method(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpsertPaymentMethodRequest>,
) -> Result<Json<PaymentMethod>, AppError> {
    let details = PaymentDetails::from_parts(request.method_type, request.details)?;

    let method = payment_method_service::upsert_payment_method(
        state.store.as_ref(),
        auth.user_id,
        details,
        request.is_default,
    )
    .await?;

    Ok(Json(method))
}

pub async fn payment_method_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<PaymentMethodHistory>>, AppError> {
    let history =
        payment_method_service::payment_method_history(state.store.as_ref(), auth.user_id).await?;
    Ok(Json(history))
}
