//! Balance reads with self-healing reconciliation.
//!
//! The cached `balance_minor` is trusted while it is positive. A zero (or
//! negative) cache is ambiguous: the seller may really have nothing left, or
//! the cache may never have been initialised or may have drifted. In that
//! case the balance is recomputed from history and written back:
//!
//! ```text
//! balance = sum(sales.amount)
//!         - sum(withdrawals.amount where status in (completed, pending))
//! ```
//!
//! Rejected and deleted withdrawals are already refunded, so they are left
//! out. A genuinely empty account is recomputed on every read, which is
//! harmless because the recomputation is idempotent.

use uuid::Uuid;

use crate::{error::AppError, services::ledger_service, store::LedgerStore};

/// Current spendable balance of `user_id`, in minor units.
///
/// # Process
///
/// 1. Read the cached balance without locking; unknown account returns 0
/// 2. Positive cache: return it, nothing is written
/// 3. Otherwise lock the account row and read it again
/// 4. Recompute from sales and outstanding withdrawals
/// 5. Persist the recomputed value (with a journal entry) and commit
///
/// # Errors
///
/// Only storage failures. A missing account is not an error.
pub async fn get_user_balance(store: &dyn LedgerStore, user_id: Uuid) -> Result<i64, AppError> {
    match store.fetch_balance(user_id).await? {
        None => return Ok(0),
        Some(balance) if balance > 0 => return Ok(balance),
        Some(_) => {}
    }

    let mut tx = store.begin().await?;

    // Re-check under the row lock; a concurrent sale may have landed
    let Some(cached) = tx.lock_balance(user_id).await? else {
        return Ok(0);
    };
    if cached > 0 {
        return Ok(cached);
    }

    let total_sales = tx.sum_sales(user_id).await?;
    let outstanding = tx.sum_outstanding_withdrawals(user_id).await?;
    let computed = total_sales - outstanding;

    if computed == cached {
        return Ok(cached);
    }

    ledger_service::overwrite_on_reconciliation(tx.as_mut(), user_id, cached, computed).await?;
    tx.commit().await?;

    tracing::info!(
        %user_id,
        cached,
        computed,
        "Balance reconciled from history"
    );

    Ok(computed)
}
