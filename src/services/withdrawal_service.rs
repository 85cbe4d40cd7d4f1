//! Withdrawal service - request, administer and cancel payouts.
//!
//! Each operation is one atomic unit combining the withdrawal row change with
//! its balance mutation. A balance change without the matching status change
//! (or the reverse) is never observable.
//!
//! | Transition                  | Actor         | Balance        |
//! |-----------------------------|---------------|----------------|
//! | (new) → pending             | owner         | debit amount   |
//! | pending → processing        | administrator | none           |
//! | pending/processing → completed | administrator | none        |
//! | pending/processing → rejected  | administrator | refund amount |
//! | pending → deleted           | owner         | refund amount  |

use uuid::Uuid;

use crate::{
    error::AppError,
    models::withdrawal::{
        NewWithdrawal, TransactionDetails, Withdrawal, WithdrawalStatus,
    },
    services::ledger_service,
    store::LedgerStore,
};

/// Request a withdrawal of `amount_minor` from the caller's balance.
///
/// # Process
///
/// 1. Validate amount
/// 2. Start database transaction
/// 3. Lock the account and check the balance covers the amount
/// 4. Snapshot the current payment method into `bank_details`
/// 5. Insert the pending withdrawal
/// 6. Debit the balance (conditional on funds at write time)
/// 7. Commit
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero or negative
/// - `InsufficientBalance`: account missing or balance below amount
/// - `NoPaymentMethod`: no payout destination saved
/// - `Database`: nothing was written; safe to retry
pub async fn request_withdrawal(
    store: &dyn LedgerStore,
    user_id: Uuid,
    amount_minor: i64,
) -> Result<Withdrawal, AppError> {
    if amount_minor <= 0 {
        return Err(AppError::InvalidAmount(amount_minor.to_string()));
    }

    let mut tx = store.begin().await?;

    let balance = tx.lock_balance(user_id).await?.unwrap_or(0);
    if balance < amount_minor {
        tracing::warn!(%user_id, balance, amount_minor, "Withdrawal exceeds balance");
        return Err(AppError::InsufficientBalance);
    }

    let payment_method = tx
        .find_payment_method(user_id)
        .await?
        .ok_or(AppError::NoPaymentMethod)?;

    let withdrawal = tx
        .insert_withdrawal(&NewWithdrawal {
            user_id,
            amount_minor,
            bank_details: payment_method.details,
        })
        .await?;

    let balance_after =
        ledger_service::debit_on_withdrawal_request(tx.as_mut(), user_id, amount_minor, withdrawal.id)
            .await?;

    tx.commit().await?;

    tracing::info!(
        withdrawal_id = %withdrawal.id,
        %user_id,
        amount_minor,
        balance_after,
        "Withdrawal requested"
    );

    Ok(withdrawal)
}

/// Move a withdrawal to a new status on behalf of an administrator.
///
/// `raw_status` is validated against the closed status set before storage is
/// touched. Transaction details are optional and only kept when completing;
/// they are dropped for every other status.
///
/// # Errors
///
/// - `InvalidStatus`: unknown status value
/// - `NotFound`: withdrawal doesn't exist
/// - `InvalidState`: transition not allowed from the current status
pub async fn update_withdrawal_status(
    store: &dyn LedgerStore,
    withdrawal_id: Uuid,
    raw_status: &str,
    transaction_details: Option<TransactionDetails>,
) -> Result<Withdrawal, AppError> {
    let status: WithdrawalStatus = raw_status.parse()?;

    let transaction_details = match status {
        WithdrawalStatus::Completed => transaction_details,
        _ => None,
    };

    let mut tx = store.begin().await?;

    let current = tx
        .lock_withdrawal(withdrawal_id)
        .await?
        .ok_or(AppError::NotFound("Withdrawal"))?;

    if !current.status.can_transition_to(status) {
        return Err(AppError::InvalidState(format!(
            "Cannot move a {} withdrawal to {}",
            current.status, status
        )));
    }

    let updated = tx
        .update_withdrawal_status(withdrawal_id, status, transaction_details.as_ref())
        .await?;

    if status == WithdrawalStatus::Rejected {
        ledger_service::credit_on_withdrawal_refund(
            tx.as_mut(),
            current.user_id,
            current.amount_minor,
            withdrawal_id,
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        %withdrawal_id,
        from = %current.status,
        to = %status,
        "Withdrawal status updated"
    );

    Ok(updated)
}

/// Cancel a pending withdrawal and refund its owner.
///
/// # Errors
///
/// - `NotFound`: withdrawal doesn't exist
/// - `Unauthorized`: caller does not own the withdrawal
/// - `InvalidState`: withdrawal is no longer pending
pub async fn delete_withdrawal(
    store: &dyn LedgerStore,
    user_id: Uuid,
    withdrawal_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = store.begin().await?;

    let withdrawal = tx
        .lock_withdrawal(withdrawal_id)
        .await?
        .ok_or(AppError::NotFound("Withdrawal"))?;

    if withdrawal.user_id != user_id {
        tracing::warn!(%withdrawal_id, %user_id, "Delete attempted by non-owner");
        return Err(AppError::Unauthorized);
    }

    if withdrawal.status != WithdrawalStatus::Pending {
        return Err(AppError::InvalidState(
            "Only pending withdrawals can be deleted".to_string(),
        ));
    }

    tx.delete_withdrawal(withdrawal_id).await?;
    let balance_after = ledger_service::credit_on_withdrawal_refund(
        tx.as_mut(),
        user_id,
        withdrawal.amount_minor,
        withdrawal_id,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        %withdrawal_id,
        %user_id,
        amount_minor = withdrawal.amount_minor,
        balance_after,
        "Withdrawal deleted and refunded"
    );

    Ok(())
}

/// The caller's own withdrawals, newest first.
pub async fn list_user_withdrawals(
    store: &dyn LedgerStore,
    user_id: Uuid,
) -> Result<Vec<Withdrawal>, AppError> {
    store.list_withdrawals(Some(user_id)).await
}

/// Every withdrawal on the platform, newest first (administrators).
pub async fn list_all_withdrawals(store: &dyn LedgerStore) -> Result<Vec<Withdrawal>, AppError> {
    store.list_withdrawals(None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ledger_entry::LedgerEntryKind,
        payment_method::{BankDetails, PaymentDetails},
    };
    use crate::services::balance_service;
    use crate::store::memory::MemoryStore;

    fn bank() -> PaymentDetails {
        PaymentDetails::Bank(BankDetails {
            account_number: "001234567890".to_string(),
            account_name: "Asha Rao".to_string(),
            bank_name: "State Bank".to_string(),
            ifsc_code: "SBIN0001234".to_string(),
        })
    }

    fn receipt() -> TransactionDetails {
        TransactionDetails {
            transaction_id: "UTR0042".to_string(),
            date: "2025-01-15".to_string(),
            reference: "NEFT batch 7".to_string(),
            notes: None,
        }
    }

    async fn seller_with(store: &MemoryStore, balance: i64) -> Uuid {
        let user = store.add_user("seller", balance).await;
        store.add_payment_method(user, bank()).await;
        user
    }

    #[tokio::test]
    async fn request_debits_and_snapshots_payment_method() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;

        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();

        assert_eq!(store.balance_of(user).await, Some(6_000));
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(withdrawal.bank_details, bank());
        assert!(withdrawal.transaction_details.is_none());

        let entries = store.ledger_of(user).await;
        assert_eq!(entries[0].kind, LedgerEntryKind::WithdrawalDebit);
        assert_eq!(entries[0].amount_minor, -4_000);
        assert_eq!(entries[0].balance_after_minor, 6_000);
    }

    #[tokio::test]
    async fn snapshot_survives_payment_method_change() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 1_000).await.unwrap();

        store
            .add_payment_method(
                user,
                PaymentDetails::Upi(crate::models::payment_method::UpiDetails {
                    upi_id: "new@okbank".to_string(),
                }),
            )
            .await;

        let stored = store.withdrawal(withdrawal.id).await.unwrap();
        assert_eq!(stored.bank_details, bank());
    }

    #[tokio::test]
    async fn rejection_refunds_and_clears_details() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();

        let rejected = update_withdrawal_status(&store, withdrawal.id, "rejected", Some(receipt()))
            .await
            .unwrap();

        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert!(rejected.transaction_details.is_none());
        assert_eq!(store.balance_of(user).await, Some(10_000));
    }

    #[tokio::test]
    async fn completion_attaches_receipt_without_balance_change() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();

        update_withdrawal_status(&store, withdrawal.id, "processing", Some(receipt()))
            .await
            .unwrap();
        let processing = store.withdrawal(withdrawal.id).await.unwrap();
        assert!(processing.transaction_details.is_none());

        let completed = update_withdrawal_status(&store, withdrawal.id, "completed", Some(receipt()))
            .await
            .unwrap();

        assert_eq!(completed.status, WithdrawalStatus::Completed);
        assert_eq!(completed.transaction_details, Some(receipt()));
        assert_eq!(store.balance_of(user).await, Some(6_000));
    }

    #[tokio::test]
    async fn completion_without_receipt_stores_none() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();

        let completed = update_withdrawal_status(&store, withdrawal.id, "completed", None)
            .await
            .unwrap();

        assert_eq!(completed.status, WithdrawalStatus::Completed);
        assert!(completed.transaction_details.is_none());

        let stored = store.withdrawal(withdrawal.id).await.unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Completed);
        assert!(stored.transaction_details.is_none());
        assert_eq!(store.balance_of(user).await, Some(6_000));
    }

    #[tokio::test]
    async fn processing_then_completed_keeps_the_debit() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();
        assert_eq!(store.balance_of(user).await, Some(6_000));

        let processing = update_withdrawal_status(&store, withdrawal.id, "processing", None)
            .await
            .unwrap();
        assert_eq!(processing.status, WithdrawalStatus::Processing);
        assert!(processing.transaction_details.is_none());
        assert_eq!(store.balance_of(user).await, Some(6_000));

        let completed = update_withdrawal_status(&store, withdrawal.id, "completed", Some(receipt()))
            .await
            .unwrap();
        assert_eq!(completed.status, WithdrawalStatus::Completed);
        assert_eq!(completed.transaction_details, Some(receipt()));
        assert_eq!(store.balance_of(user).await, Some(6_000));

        let stored = store.withdrawal(withdrawal.id).await.unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Completed);
        assert_eq!(stored.transaction_details, Some(receipt()));

        let kinds: Vec<_> = store.ledger_of(user).await.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![LedgerEntryKind::WithdrawalDebit]);
    }

    #[tokio::test]
    async fn processing_then_rejected_refunds_once() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();

        let processing =
            update_withdrawal_status(&store, withdrawal.id, "processing", Some(receipt()))
                .await
                .unwrap();
        assert_eq!(processing.status, WithdrawalStatus::Processing);
        assert!(processing.transaction_details.is_none());
        assert_eq!(store.balance_of(user).await, Some(6_000));

        let rejected = update_withdrawal_status(&store, withdrawal.id, "rejected", Some(receipt()))
            .await
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);
        assert!(rejected.transaction_details.is_none());
        assert_eq!(store.balance_of(user).await, Some(10_000));

        let stored = store.withdrawal(withdrawal.id).await.unwrap();
        assert_eq!(stored.status, WithdrawalStatus::Rejected);
        assert!(stored.transaction_details.is_none());

        let refunds = store
            .ledger_of(user)
            .await
            .iter()
            .filter(|e| e.kind == LedgerEntryKind::WithdrawalRefund)
            .count();
        assert_eq!(refunds, 1);

        let err = update_withdrawal_status(&store, withdrawal.id, "rejected", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(store.balance_of(user).await, Some(10_000));
    }

    #[tokio::test]
    async fn terminal_withdrawal_cannot_be_refunded_twice() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();
        update_withdrawal_status(&store, withdrawal.id, "rejected", None)
            .await
            .unwrap();

        let err = update_withdrawal_status(&store, withdrawal.id, "rejected", None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(store.balance_of(user).await, Some(10_000));
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_before_any_write() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();
        let commits = store.commit_count();

        let err = update_withdrawal_status(&store, withdrawal.id, "paid", Some(receipt()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidStatus(_)));
        assert_eq!(store.commit_count(), commits);

        // Also before the existence check
        let err = update_withdrawal_status(&store, Uuid::new_v4(), "paid", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStatus(_)));
    }

    #[tokio::test]
    async fn status_update_on_missing_withdrawal() {
        let store = MemoryStore::new();
        let err = update_withdrawal_status(&store, Uuid::new_v4(), "rejected", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Withdrawal")));
    }

    #[tokio::test]
    async fn overdraft_request_leaves_no_trace() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 100).await;

        let err = request_withdrawal(&store, user, 1_000).await.unwrap_err();

        assert!(matches!(err, AppError::InsufficientBalance));
        assert_eq!(store.balance_of(user).await, Some(100));
        assert_eq!(store.withdrawal_count().await, 0);
    }

    #[tokio::test]
    async fn request_without_payment_method_fails() {
        let store = MemoryStore::new();
        let user = store.add_user("seller", 10_000).await;

        let err = request_withdrawal(&store, user, 1_000).await.unwrap_err();

        assert!(matches!(err, AppError::NoPaymentMethod));
        assert_eq!(store.balance_of(user).await, Some(10_000));
    }

    #[tokio::test]
    async fn non_positive_amount_is_invalid() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;

        for amount in [0, -50] {
            let err = request_withdrawal(&store, user, amount).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidAmount(_)));
        }
    }

    #[tokio::test]
    async fn aborted_commit_leaves_balance_and_rows_untouched() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        store.fail_commits(true);

        let err = request_withdrawal(&store, user, 4_000).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(store.balance_of(user).await, Some(10_000));
        assert_eq!(store.withdrawal_count().await, 0);
        assert!(store.ledger_of(user).await.is_empty());
    }

    #[tokio::test]
    async fn owner_deletes_pending_withdrawal() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();

        delete_withdrawal(&store, user, withdrawal.id).await.unwrap();

        assert_eq!(store.balance_of(user).await, Some(10_000));
        assert!(store.withdrawal(withdrawal.id).await.is_none());
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let store = MemoryStore::new();
        let owner = seller_with(&store, 10_000).await;
        let intruder = store.add_user("intruder", 0).await;
        let withdrawal = request_withdrawal(&store, owner, 4_000).await.unwrap();

        let err = delete_withdrawal(&store, intruder, withdrawal.id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(store.balance_of(owner).await, Some(6_000));
        assert_eq!(store.balance_of(intruder).await, Some(0));
        assert!(store.withdrawal(withdrawal.id).await.is_some());
    }

    #[tokio::test]
    async fn only_pending_withdrawals_are_deletable() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;
        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();
        update_withdrawal_status(&store, withdrawal.id, "processing", None)
            .await
            .unwrap();

        let err = delete_withdrawal(&store, user, withdrawal.id).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(store.balance_of(user).await, Some(6_000));
    }

    #[tokio::test]
    async fn deleting_missing_withdrawal_is_not_found() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 0).await;
        let err = delete_withdrawal(&store, user, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("Withdrawal")));
    }

    #[tokio::test]
    async fn listings_are_newest_first_and_scoped() {
        let store = MemoryStore::new();
        let a = seller_with(&store, 10_000).await;
        let b = seller_with(&store, 10_000).await;
        let first = request_withdrawal(&store, a, 1_000).await.unwrap();
        let second = request_withdrawal(&store, a, 2_000).await.unwrap();
        request_withdrawal(&store, b, 3_000).await.unwrap();

        let mine = list_user_withdrawals(&store, a).await.unwrap();
        assert_eq!(
            mine.iter().map(|w| w.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
        assert_eq!(list_all_withdrawals(&store).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn scenario_request_then_reject_restores_balance() {
        let store = MemoryStore::new();
        let user = seller_with(&store, 10_000).await;

        let withdrawal = request_withdrawal(&store, user, 4_000).await.unwrap();
        assert_eq!(balance_service::get_user_balance(&store, user).await.unwrap(), 6_000);

        update_withdrawal_status(&store, withdrawal.id, "rejected", None)
            .await
            .unwrap();
        assert_eq!(balance_service::get_user_balance(&store, user).await.unwrap(), 10_000);
    }
}
