//! Payout destination management.

use uuid::Uuid;

use crate::{
    error::AppError,
    models::payment_method::{PaymentDetails, PaymentMethod, PaymentMethodHistory},
    store::LedgerStore,
};

/// Create or replace the user's payment method.
///
/// The new details are validated first, then the live row and a history
/// entry are written in the same atomic unit.
///
/// # Errors
///
/// - `InvalidRequest`: details fail field validation
pub async fn upsert_payment_method(
    store: &dyn LedgerStore,
    user_id: Uuid,
    details: PaymentDetails,
    is_default: bool,
) -> Result<PaymentMethod, AppError> {
    details.validate()?;

    let mut tx = store.begin().await?;
    let method = tx.upsert_payment_method(user_id, &details, is_default).await?;
    tx.insert_payment_method_history(method.id, &details).await?;
    tx.commit().await?;

    tracing::info!(
        %user_id,
        method_type = details.method_type().as_str(),
        "Payment method saved"
    );

    Ok(method)
}

/// The user's live payment method, if any.
pub async fn get_payment_method(
    store: &dyn LedgerStore,
    user_id: Uuid,
) -> Result<Option<PaymentMethod>, AppError> {
    store.find_payment_method(user_id).await
}

/// Every version of the user's payment method, newest first.
pub async fn payment_method_history(
    store: &dyn LedgerStore,
    user_id: Uuid,
) -> Result<Vec<PaymentMethodHistory>, AppError> {
    store.list_payment_method_history(user_id).await
}
