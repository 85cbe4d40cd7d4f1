//! PostgreSQL implementation of the ledger store.
//!
//! Each [`LedgerTx`] wraps one `sqlx` transaction. Row locks are taken with
//! `SELECT ... FOR UPDATE` and held until commit or rollback. JSONB columns
//! are decoded into their Rust types here and nowhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction, types::Json};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx};
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::{
    api_token::ApiToken,
    ledger_entry::{LedgerEntry, NewLedgerEntry},
    payment_method::{PaymentDetails, PaymentMethod, PaymentMethodHistory},
    product::Product,
    sale::{NewSale, Purchase, PurchaseStats, RecentSaleRow, Sale},
    withdrawal::{NewWithdrawal, TransactionDetails, Withdrawal, WithdrawalStatus},
};

/// Store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct WithdrawalRow {
    id: Uuid,
    user_id: Uuid,
    amount_minor: i64,
    status: String,
    bank_details: Json<PaymentDetails>,
    transaction_details: Option<Json<TransactionDetails>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WithdrawalRow> for Withdrawal {
    type Error = AppError;

    fn try_from(row: WithdrawalRow) -> Result<Self, Self::Error> {
        let status: WithdrawalStatus = row
            .status
            .parse()
            .map_err(|e: AppError| AppError::Database(sqlx::Error::Decode(e.to_string().into())))?;

        Ok(Withdrawal {
            id: row.id,
            user_id: row.user_id,
            amount_minor: row.amount_minor,
            status,
            bank_details: row.bank_details.0,
            transaction_details: row.transaction_details.map(|details| details.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentMethodRow {
    id: Uuid,
    user_id: Uuid,
    details: Json<PaymentDetails>,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentMethodRow> for PaymentMethod {
    fn from(row: PaymentMethodRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            details: row.details.0,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentMethodHistoryRow {
    id: Uuid,
    payment_method_id: Uuid,
    details: Json<PaymentDetails>,
    created_at: DateTime<Utc>,
}

impl From<PaymentMethodHistoryRow> for PaymentMethodHistory {
    fn from(row: PaymentMethodHistoryRow) -> Self {
        Self {
            id: row.id,
            payment_method_id: row.payment_method_id,
            details: row.details.0,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LedgerEntryRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    amount_minor: i64,
    balance_after_minor: i64,
    reference_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse()
            .map_err(|e: String| AppError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(LedgerEntry {
            id: row.id,
            user_id: row.user_id,
            kind,
            amount_minor: row.amount_minor,
            balance_after_minor: row.balance_after_minor,
            reference_id: row.reference_id,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<Uuid>, AppError> {
        let token = sqlx::query_as::<_, ApiToken>(
            r#"
            SELECT id, user_id, token_hash, created_at, is_active
            FROM api_tokens
            WHERE token_hash = $1 AND is_active = true
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token.map(|t| t.user_id))
    }

    async fn fetch_balance(&self, user_id: Uuid) -> Result<Option<i64>, AppError> {
        let balance = sqlx::query_scalar("SELECT balance_minor FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(balance)
    }

    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, seller_id, title, price_minor, file_url, is_visible, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn find_payment_method(&self, user_id: Uuid) -> Result<Option<PaymentMethod>, AppError> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r#"
            SELECT id, user_id, details, is_default, created_at, updated_at
            FROM payment_methods
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_payment_method_history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PaymentMethodHistory>, AppError> {
        let rows = sqlx::query_as::<_, PaymentMethodHistoryRow>(
            r#"
            SELECT h.id, h.payment_method_id, h.details, h.created_at
            FROM payment_method_history h
            JOIN payment_methods pm ON pm.id = h.payment_method_id
            WHERE pm.user_id = $1
            ORDER BY h.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_withdrawals(&self, user_id: Option<Uuid>) -> Result<Vec<Withdrawal>, AppError> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            SELECT id, user_id, amount_minor, status, bank_details, transaction_details,
                   created_at, updated_at
            FROM withdrawals
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Withdrawal::try_from).collect()
    }

    async fn list_recent_sales(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentSaleRow>, AppError> {
        let rows = sqlx::query_as::<_, RecentSaleRow>(
            r#"
            SELECT s.id, s.amount_minor, s.created_at,
                   p.title AS product_title,
                   u.name AS buyer_name
            FROM sales s
            JOIN products p ON p.id = s.product_id
            LEFT JOIN users u ON u.id = s.buyer_id
            WHERE s.seller_id = $1
            ORDER BY s.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(seller_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_sales_since(
        &self,
        seller_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sale>, AppError> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, seller_id, buyer_id, amount_minor, gateway_payment_id,
                   status, created_at
            FROM sales
            WHERE seller_id = $1 AND created_at >= $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(seller_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    async fn list_purchases(&self, buyer_id: Uuid) -> Result<Vec<Purchase>, AppError> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT s.id, s.product_id,
                   p.title AS product_title,
                   p.file_url,
                   u.name AS seller_name,
                   s.amount_minor, s.status, s.created_at
            FROM sales s
            JOIN products p ON p.id = s.product_id
            JOIN users u ON u.id = s.seller_id
            WHERE s.buyer_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(buyer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    async fn purchase_stats(&self, buyer_id: Uuid) -> Result<PurchaseStats, AppError> {
        let stats = sqlx::query_as::<_, PurchaseStats>(
            r#"
            SELECT COUNT(*)::BIGINT AS total_purchases,
                   COALESCE(SUM(amount_minor), 0)::BIGINT AS total_spent_minor
            FROM sales
            WHERE buyer_id = $1
            "#,
        )
        .bind(buyer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn list_ledger_entries(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            SELECT id, user_id, kind, amount_minor, balance_after_minor, reference_id, created_at
            FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<i64>, AppError> {
        // FOR UPDATE blocks other writers of this account until we finish
        let balance = sqlx::query_scalar("SELECT balance_minor FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(balance)
    }

    async fn adjust_balance(
        &mut self,
        user_id: Uuid,
        delta_minor: i64,
    ) -> Result<Option<i64>, AppError> {
        let balance = sqlx::query_scalar(
            r#"
            UPDATE users
            SET balance_minor = balance_minor + $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING balance_minor
            "#,
        )
        .bind(delta_minor)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance)
    }

    async fn debit_balance_if_covered(
        &mut self,
        user_id: Uuid,
        amount_minor: i64,
    ) -> Result<Option<i64>, AppError> {
        // The balance check is part of the UPDATE itself, so it is evaluated
        // against the row as it is at write time.
        let balance = sqlx::query_scalar(
            r#"
            UPDATE users
            SET balance_minor = balance_minor - $1,
                updated_at = NOW()
            WHERE id = $2 AND balance_minor >= $1
            RETURNING balance_minor
            "#,
        )
        .bind(amount_minor)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance)
    }

    async fn set_balance(&mut self, user_id: Uuid, balance_minor: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET balance_minor = $1, updated_at = NOW() WHERE id = $2")
            .bind(balance_minor)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn sum_sales(&mut self, seller_id: Uuid) -> Result<i64, AppError> {
        let total = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_minor), 0)::BIGINT FROM sales WHERE seller_id = $1",
        )
        .bind(seller_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn sum_outstanding_withdrawals(&mut self, user_id: Uuid) -> Result<i64, AppError> {
        let total = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_minor), 0)::BIGINT
            FROM withdrawals
            WHERE user_id = $1 AND status IN ('completed', 'pending')
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(total)
    }

    async fn find_payment_method(
        &mut self,
        user_id: Uuid,
    ) -> Result<Option<PaymentMethod>, AppError> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r#"
            SELECT id, user_id, details, is_default, created_at, updated_at
            FROM payment_methods
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn upsert_payment_method(
        &mut self,
        user_id: Uuid,
        details: &PaymentDetails,
        is_default: bool,
    ) -> Result<PaymentMethod, AppError> {
        let row = sqlx::query_as::<_, PaymentMethodRow>(
            r#"
            INSERT INTO payment_methods (user_id, method_type, details, is_default)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET method_type = EXCLUDED.method_type,
                details = EXCLUDED.details,
                is_default = EXCLUDED.is_default,
                updated_at = NOW()
            RETURNING id, user_id, details, is_default, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(details.method_type().as_str())
        .bind(Json(details))
        .bind(is_default)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn insert_payment_method_history(
        &mut self,
        payment_method_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<PaymentMethodHistory, AppError> {
        let row = sqlx::query_as::<_, PaymentMethodHistoryRow>(
            r#"
            INSERT INTO payment_method_history (payment_method_id, method_type, details)
            VALUES ($1, $2, $3)
            RETURNING id, payment_method_id, details, created_at
            "#,
        )
        .bind(payment_method_id)
        .bind(details.method_type().as_str())
        .bind(Json(details))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn find_sale_by_gateway_payment_id(
        &mut self,
        gateway_payment_id: &str,
    ) -> Result<Option<Sale>, AppError> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, product_id, seller_id, buyer_id, amount_minor, gateway_payment_id,
                   status, created_at
            FROM sales
            WHERE gateway_payment_id = $1
            "#,
        )
        .bind(gateway_payment_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sale)
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<Option<Sale>, AppError> {
        // A concurrent insert of the same payment id makes this wait for the
        // other unit, then skip the row instead of failing
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (product_id, seller_id, buyer_id, amount_minor, gateway_payment_id, status)
            VALUES ($1, $2, $3, $4, $5, 'completed')
            ON CONFLICT (gateway_payment_id) DO NOTHING
            RETURNING id, product_id, seller_id, buyer_id, amount_minor, gateway_payment_id,
                      status, created_at
            "#,
        )
        .bind(sale.product_id)
        .bind(sale.seller_id)
        .bind(sale.buyer_id)
        .bind(sale.amount_minor)
        .bind(&sale.gateway_payment_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sale)
    }

    async fn insert_withdrawal(
        &mut self,
        withdrawal: &NewWithdrawal,
    ) -> Result<Withdrawal, AppError> {
        let row = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            INSERT INTO withdrawals (user_id, amount_minor, status, bank_details)
            VALUES ($1, $2, 'pending', $3)
            RETURNING id, user_id, amount_minor, status, bank_details, transaction_details,
                      created_at, updated_at
            "#,
        )
        .bind(withdrawal.user_id)
        .bind(withdrawal.amount_minor)
        .bind(Json(&withdrawal.bank_details))
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn lock_withdrawal(
        &mut self,
        withdrawal_id: Uuid,
    ) -> Result<Option<Withdrawal>, AppError> {
        let row = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            SELECT id, user_id, amount_minor, status, bank_details, transaction_details,
                   created_at, updated_at
            FROM withdrawals
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(withdrawal_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Withdrawal::try_from).transpose()
    }

    async fn update_withdrawal_status(
        &mut self,
        withdrawal_id: Uuid,
        status: WithdrawalStatus,
        transaction_details: Option<&TransactionDetails>,
    ) -> Result<Withdrawal, AppError> {
        let row = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            UPDATE withdrawals
            SET status = $1,
                transaction_details = $2,
                updated_at = NOW()
            WHERE id = $3
            RETURNING id, user_id, amount_minor, status, bank_details, transaction_details,
                      created_at, updated_at
            "#,
        )
        .bind(status.as_str())
        .bind(transaction_details.map(Json))
        .bind(withdrawal_id)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn delete_withdrawal(&mut self, withdrawal_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM withdrawals WHERE id = $1")
            .bind(withdrawal_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn insert_ledger_entry(
        &mut self,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntry, AppError> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            INSERT INTO ledger_entries (user_id, kind, amount_minor, balance_after_minor, reference_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, kind, amount_minor, balance_after_minor, reference_id, created_at
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.kind.as_str())
        .bind(entry.amount_minor)
        .bind(entry.balance_after_minor)
        .bind(entry.reference_id)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
