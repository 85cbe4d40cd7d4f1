//! Checkout handlers. Buyers may be signed in or guests.

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::OptionalAuth,
    models::sale::{CreateOrderRequest, CreateOrderResponse, RecordedSale, VerifyPaymentRequest},
    services::checkout_service,
};
use axum::{Extension, Json, extract::State};

/// Open a gateway order for a product.
///
/// # Endpoint
///
/// `POST /api/v1/payments/orders`
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "order_id": "order_N5d1...",
///   "amount_minor": 49900,
///   "currency": "INR",
///   "key_id": "rzp_live_..."
/// }
/// ```
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let order = checkout_service::create_order(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.currency,
        request.product_id,
    )
    .await?;

    Ok(Json(order))
}

/// Verify a checkout callback, record the sale and return the download.
///
/// # Endpoint
///
/// `POST /api/v1/payments/verify`
///
/// # Response
///
/// - **200 OK**: `{"sale_id": "...", "file_url": "..."}`
/// - **400**: signature mismatch or unusable gateway amount
/// - **502**: gateway unreachable
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(OptionalAuth(auth)): Extension<OptionalAuth>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<RecordedSale>, AppError> {
    let recorded = checkout_service::verify_payment(
        state.store.as_ref(),
        state.gateway.as_ref(),
        auth.map(|a| a.user_id),
        request,
    )
    .await?;

    Ok(Json(recorded))
}
