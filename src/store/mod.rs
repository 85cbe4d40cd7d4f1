//! Storage access for the ledger.
//!
//! Services never talk to the database directly. They either call a read-only
//! query on [`LedgerStore`], or open a [`LedgerTx`] with [`LedgerStore::begin`]
//! and perform every read-check-write step of one operation through it.
//!
//! # Atomicity Guarantees
//!
//! A `LedgerTx` is a single commit-or-abort unit. Nothing written through it
//! becomes visible until [`LedgerTx::commit`] succeeds. Dropping the handle
//! without committing (including via an early `?` return) discards every write.
//!
//! # Implementations
//!
//! - [`postgres::PgStore`]: PostgreSQL, one database transaction per `LedgerTx`
//! - `memory::MemoryStore` (tests only): serialized in-memory state with
//!   commit-fault injection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    ledger_entry::{LedgerEntry, NewLedgerEntry},
    payment_method::{PaymentDetails, PaymentMethod, PaymentMethodHistory},
    product::Product,
    sale::{NewSale, Purchase, PurchaseStats, RecentSaleRow, Sale},
    withdrawal::{NewWithdrawal, TransactionDetails, Withdrawal, WithdrawalStatus},
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Read-only queries plus the entry point for atomic units.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a new atomic unit.
    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, AppError>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), AppError>;

    /// Resolve an active token hash to its user.
    async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<Uuid>, AppError>;

    /// Cached balance, without locking. `None` if the account does not exist.
    async fn fetch_balance(&self, user_id: Uuid) -> Result<Option<i64>, AppError>;

    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError>;

    async fn find_payment_method(&self, user_id: Uuid) -> Result<Option<PaymentMethod>, AppError>;

    /// Payment method history of a user, newest first.
    async fn list_payment_method_history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PaymentMethodHistory>, AppError>;

    /// Withdrawals newest first; all users when `user_id` is `None`.
    async fn list_withdrawals(&self, user_id: Option<Uuid>) -> Result<Vec<Withdrawal>, AppError>;

    /// Latest sales of a seller, newest first.
    async fn list_recent_sales(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentSaleRow>, AppError>;

    /// Sales of a seller made at or after `since`, oldest first.
    async fn list_sales_since(
        &self,
        seller_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sale>, AppError>;

    /// Purchases made by a signed-in buyer, newest first.
    async fn list_purchases(&self, buyer_id: Uuid) -> Result<Vec<Purchase>, AppError>;

    async fn purchase_stats(&self, buyer_id: Uuid) -> Result<PurchaseStats, AppError>;

    /// Latest journal entries of a user, newest first.
    async fn list_ledger_entries(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, AppError>;
}

/// One atomic unit of ledger work.
///
/// Methods named `lock_*` hold the row for the rest of the unit, so a
/// precondition checked on a locked row still holds at commit time.
#[async_trait]
pub trait LedgerTx: Send {
    /// Lock the account row and read its cached balance.
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<i64>, AppError>;

    /// Add `delta_minor` to the balance. Returns the new balance, or `None`
    /// if the account does not exist.
    async fn adjust_balance(
        &mut self,
        user_id: Uuid,
        delta_minor: i64,
    ) -> Result<Option<i64>, AppError>;

    /// Subtract `amount_minor` only if the balance covers it at write time.
    /// Returns the new balance, or `None` if nothing was debited.
    async fn debit_balance_if_covered(
        &mut self,
        user_id: Uuid,
        amount_minor: i64,
    ) -> Result<Option<i64>, AppError>;

    /// Overwrite the cached balance.
    async fn set_balance(&mut self, user_id: Uuid, balance_minor: i64) -> Result<(), AppError>;

    /// Total of all sales credited to `seller_id`.
    async fn sum_sales(&mut self, seller_id: Uuid) -> Result<i64, AppError>;

    /// Total of the user's withdrawals that still count against the balance
    /// (`pending` and `completed`).
    async fn sum_outstanding_withdrawals(&mut self, user_id: Uuid) -> Result<i64, AppError>;

    async fn find_payment_method(&mut self, user_id: Uuid)
    -> Result<Option<PaymentMethod>, AppError>;

    /// Create or replace the user's payment method.
    async fn upsert_payment_method(
        &mut self,
        user_id: Uuid,
        details: &PaymentDetails,
        is_default: bool,
    ) -> Result<PaymentMethod, AppError>;

    async fn insert_payment_method_history(
        &mut self,
        payment_method_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<PaymentMethodHistory, AppError>;

    async fn find_sale_by_gateway_payment_id(
        &mut self,
        gateway_payment_id: &str,
    ) -> Result<Option<Sale>, AppError>;

    /// Insert a sale unless its gateway payment id is already recorded.
    /// Returns `None` on such a conflict, including one with a unit that
    /// committed concurrently.
    async fn insert_sale(&mut self, sale: &NewSale) -> Result<Option<Sale>, AppError>;

    async fn insert_withdrawal(&mut self, withdrawal: &NewWithdrawal)
    -> Result<Withdrawal, AppError>;

    /// Lock a withdrawal row for the rest of the unit.
    async fn lock_withdrawal(&mut self, withdrawal_id: Uuid)
    -> Result<Option<Withdrawal>, AppError>;

    /// Set the status and replace the transaction details (`None` clears them).
    async fn update_withdrawal_status(
        &mut self,
        withdrawal_id: Uuid,
        status: WithdrawalStatus,
        transaction_details: Option<&TransactionDetails>,
    ) -> Result<Withdrawal, AppError>;

    async fn delete_withdrawal(&mut self, withdrawal_id: Uuid) -> Result<(), AppError>;

    async fn insert_ledger_entry(&mut self, entry: &NewLedgerEntry)
    -> Result<LedgerEntry, AppError>;

    /// Make every write of this unit visible at once.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
