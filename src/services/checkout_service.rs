//! Checkout: gateway order creation and payment verification.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::sale::{CreateOrderResponse, RecordedSale, VerifyPaymentRequest},
    services::{
        payment_gateway::PaymentGateway,
        sale_service::{self, SaleRequest},
    },
    store::LedgerStore,
};

/// Open a gateway order for the list price of a visible product.
///
/// # Errors
///
/// - `NotFound`: product missing or hidden
/// - `Gateway`: the gateway could not be reached or refused the order
pub async fn create_order(
    store: &dyn LedgerStore,
    gateway: &dyn PaymentGateway,
    currency: &str,
    product_id: Uuid,
) -> Result<CreateOrderResponse, AppError> {
    let product = store
        .find_product(product_id)
        .await?
        .filter(|p| p.is_visible)
        .ok_or(AppError::NotFound("Product"))?;

    let receipt = format!("{}_{}", product.id, Utc::now().timestamp_millis());
    let order = gateway
        .create_order(product.price_minor, currency, &receipt)
        .await?;

    Ok(CreateOrderResponse {
        order_id: order.order_id,
        amount_minor: order.amount_minor,
        currency: order.currency,
        key_id: gateway.key_id().to_string(),
    })
}

/// Verify a checkout callback and record the sale.
///
/// # Process
///
/// 1. Check the gateway signature over order id and payment id
/// 2. Fetch the captured amount from the gateway
/// 3. Record the sale for that amount (idempotent per payment)
///
/// # Errors
///
/// - `PaymentVerification`: signature mismatch
/// - `InvalidAmount`: gateway reported no usable amount
/// - any error of [`sale_service::record_sale`]
pub async fn verify_payment(
    store: &dyn LedgerStore,
    gateway: &dyn PaymentGateway,
    buyer_id: Option<Uuid>,
    request: VerifyPaymentRequest,
) -> Result<RecordedSale, AppError> {
    if !gateway.verify_signature(
        &request.gateway_order_id,
        &request.gateway_payment_id,
        &request.gateway_signature,
    ) {
        tracing::warn!(
            order_id = %request.gateway_order_id,
            payment_id = %request.gateway_payment_id,
            "Payment signature mismatch"
        );
        return Err(AppError::PaymentVerification(
            "Invalid payment signature".to_string(),
        ));
    }

    let amount_minor = gateway
        .fetch_payment_amount(&request.gateway_payment_id)
        .await?;

    sale_service::record_sale(
        store,
        SaleRequest {
            product_id: request.product_id,
            seller_id: request.seller_id,
            buyer_id,
            amount_minor,
            gateway_payment_id: request.gateway_payment_id,
        },
    )
    .await
}
