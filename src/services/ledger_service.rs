//! Ledger primitives - the only sanctioned ways to change a cached balance.
//!
//! Every primitive runs on a caller-supplied [`LedgerTx`], so the balance
//! change commits or aborts together with the record that triggered it
//! (a sale, a new withdrawal, a rejected or deleted withdrawal). Each one also
//! appends a journal entry to `ledger_entries` in the same unit.
//!
//! # Atomicity Guarantees
//!
//! Nothing here commits. The calling service owns the transaction and commits
//! once every write of the operation has succeeded.

use uuid::Uuid;

use crate::{
    error::AppError,
    models::ledger_entry::{LedgerEntry, LedgerEntryKind, NewLedgerEntry},
    store::{LedgerStore, LedgerTx},
};

/// Default and maximum page size for journal listings.
const DEFAULT_ENTRY_LIMIT: i64 = 50;
const MAX_PAGE_LIMIT: i64 = 100;

/// Credit a seller with the full amount of a verified sale.
///
/// # Returns
///
/// The seller's balance after the credit.
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero or negative
/// - `NotFound`: seller account doesn't exist
pub async fn credit_on_sale(
    tx: &mut dyn LedgerTx,
    seller_id: Uuid,
    amount_minor: i64,
    sale_id: Uuid,
) -> Result<i64, AppError> {
    if amount_minor <= 0 {
        return Err(AppError::InvalidAmount(amount_minor.to_string()));
    }

    let balance = tx
        .adjust_balance(seller_id, amount_minor)
        .await?
        .ok_or(AppError::NotFound("Account"))?;

    journal(
        tx,
        seller_id,
        LedgerEntryKind::SaleCredit,
        amount_minor,
        balance,
        Some(sale_id),
    )
    .await?;

    Ok(balance)
}

/// Debit the owner of a newly created withdrawal.
///
/// The debit is conditional on the balance still covering `amount_minor` at
/// write time, so two concurrent requests can never overdraw an account.
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero or negative
/// - `InsufficientBalance`: account missing or balance below amount
pub async fn debit_on_withdrawal_request(
    tx: &mut dyn LedgerTx,
    user_id: Uuid,
    amount_minor: i64,
    withdrawal_id: Uuid,
) -> Result<i64, AppError> {
    if amount_minor <= 0 {
        return Err(AppError::InvalidAmount(amount_minor.to_string()));
    }

    let balance = tx
        .debit_balance_if_covered(user_id, amount_minor)
        .await?
        .ok_or(AppError::InsufficientBalance)?;

    journal(
        tx,
        user_id,
        LedgerEntryKind::WithdrawalDebit,
        -amount_minor,
        balance,
        Some(withdrawal_id),
    )
    .await?;

    Ok(balance)
}

/// Give a withdrawal's amount back to its owner (rejection or deletion).
///
/// # Errors
///
/// - `NotFound`: owner account doesn't exist
pub async fn credit_on_withdrawal_refund(
    tx: &mut dyn LedgerTx,
    user_id: Uuid,
    amount_minor: i64,
    withdrawal_id: Uuid,
) -> Result<i64, AppError> {
    let balance = tx
        .adjust_balance(user_id, amount_minor)
        .await?
        .ok_or(AppError::NotFound("Account"))?;

    journal(
        tx,
        user_id,
        LedgerEntryKind::WithdrawalRefund,
        amount_minor,
        balance,
        Some(withdrawal_id),
    )
    .await?;

    Ok(balance)
}

/// Overwrite a drifted cached balance with a recomputed value.
pub async fn overwrite_on_reconciliation(
    tx: &mut dyn LedgerTx,
    user_id: Uuid,
    cached_minor: i64,
    computed_minor: i64,
) -> Result<(), AppError> {
    tx.set_balance(user_id, computed_minor).await?;

    journal(
        tx,
        user_id,
        LedgerEntryKind::Reconciliation,
        computed_minor - cached_minor,
        computed_minor,
        None,
    )
    .await?;

    Ok(())
}

/// Latest journal entries of a user.
///
/// # Errors
///
/// - `InvalidRequest`: limit outside 1..=100
pub async fn list_entries(
    store: &dyn LedgerStore,
    user_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<LedgerEntry>, AppError> {
    let limit = page_limit(limit, DEFAULT_ENTRY_LIMIT)?;
    store.list_ledger_entries(user_id, limit).await
}

/// Validate an optional page size, falling back to `default`.
pub fn page_limit(limit: Option<i64>, default: i64) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(default);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(limit)
}

async fn journal(
    tx: &mut dyn LedgerTx,
    user_id: Uuid,
    kind: LedgerEntryKind,
    amount_minor: i64,
    balance_after_minor: i64,
    reference_id: Option<Uuid>,
) -> Result<LedgerEntry, AppError> {
    tx.insert_ledger_entry(&NewLedgerEntry {
        user_id,
        kind,
        amount_minor,
        balance_after_minor,
        reference_id,
    })
    .await
}
