//! In-memory ledger store for tests.
//!
//! A `MemoryTx` holds the store mutex for its whole lifetime and works on a
//! private copy of the state. Commit swaps the copy in, and dropping the
//! handle throws it away, which gives the same all-or-nothing behaviour as a
//! database transaction (fully serialized).
//!
//! `fail_commits(true)` makes every commit abort, for atomicity tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerTx};
use crate::error::AppError;
use crate::models::{
    ledger_entry::{LedgerEntry, NewLedgerEntry},
    payment_method::{PaymentDetails, PaymentMethod, PaymentMethodHistory},
    product::Product,
    sale::{NewSale, Purchase, PurchaseStats, RecentSaleRow, Sale},
    withdrawal::{NewWithdrawal, TransactionDetails, Withdrawal, WithdrawalStatus},
};

#[derive(Debug, Clone)]
struct UserRecord {
    name: String,
    balance_minor: i64,
}

#[derive(Debug, Clone, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    tokens: HashMap<String, Uuid>,
    products: HashMap<Uuid, Product>,
    sales: Vec<Sale>,
    withdrawals: Vec<Withdrawal>,
    payment_methods: HashMap<Uuid, PaymentMethod>,
    payment_method_history: Vec<PaymentMethodHistory>,
    ledger: Vec<LedgerEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

struct MemoryTx<'a> {
    guard: MutexGuard<'a, State>,
    working: State,
    /// Transaction timestamp, shared by every journal row it writes
    now: DateTime<Utc>,
    fail_commit: bool,
    commits: &'a AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit abort with a storage error.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub async fn add_user(&self, name: &str, balance_minor: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.users.insert(
            id,
            UserRecord {
                name: name.to_string(),
                balance_minor,
            },
        );
        id
    }

    pub async fn add_token(&self, token_hash: &str, user_id: Uuid) {
        self.state
            .lock()
            .await
            .tokens
            .insert(token_hash.to_string(), user_id);
    }

    pub async fn add_product(&self, seller_id: Uuid, price_minor: i64, file_url: &str) -> Uuid {
        let product = Product {
            id: Uuid::new_v4(),
            seller_id,
            title: "Lightroom presets".to_string(),
            price_minor,
            file_url: Some(file_url.to_string()),
            is_visible: true,
            created_at: Utc::now(),
        };
        let id = product.id;
        self.state.lock().await.products.insert(id, product);
        id
    }

    pub async fn add_payment_method(&self, user_id: Uuid, details: PaymentDetails) {
        let now = Utc::now();
        self.state.lock().await.payment_methods.insert(
            user_id,
            PaymentMethod {
                id: Uuid::new_v4(),
                user_id,
                details,
                is_default: true,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Seed a historical sale without touching the cached balance.
    pub async fn add_historical_sale(&self, seller_id: Uuid, amount_minor: i64) {
        self.add_sale_at(seller_id, None, amount_minor, Utc::now())
            .await;
    }

    /// Seed a sale with an explicit buyer and timestamp, balance untouched.
    pub async fn add_sale_at(
        &self,
        seller_id: Uuid,
        buyer_id: Option<Uuid>,
        amount_minor: i64,
        created_at: DateTime<Utc>,
    ) {
        self.state.lock().await.sales.push(Sale {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            seller_id,
            buyer_id,
            amount_minor,
            gateway_payment_id: format!("pay_{}", Uuid::new_v4().simple()),
            status: "completed".to_string(),
            created_at,
        });
    }

    /// Seed a historical withdrawal without touching the cached balance.
    pub async fn add_historical_withdrawal(
        &self,
        user_id: Uuid,
        amount_minor: i64,
        status: WithdrawalStatus,
        bank_details: PaymentDetails,
    ) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.state.lock().await.withdrawals.push(Withdrawal {
            id,
            user_id,
            amount_minor,
            status,
            bank_details,
            transaction_details: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub async fn balance_of(&self, user_id: Uuid) -> Option<i64> {
        self.state
            .lock()
            .await
            .users
            .get(&user_id)
            .map(|u| u.balance_minor)
    }

    pub async fn withdrawal(&self, withdrawal_id: Uuid) -> Option<Withdrawal> {
        self.state
            .lock()
            .await
            .withdrawals
            .iter()
            .find(|w| w.id == withdrawal_id)
            .cloned()
    }

    pub async fn withdrawal_count(&self) -> usize {
        self.state.lock().await.withdrawals.len()
    }

    pub async fn sales_of(&self, seller_id: Uuid) -> Vec<Sale> {
        self.state
            .lock()
            .await
            .sales
            .iter()
            .filter(|s| s.seller_id == seller_id)
            .cloned()
            .collect()
    }

    pub async fn ledger_of(&self, user_id: Uuid) -> Vec<LedgerEntry> {
        self.state
            .lock()
            .await
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, AppError> {
        let guard = self.state.lock().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            now: Utc::now(),
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
            commits: &self.commits,
        }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<Uuid>, AppError> {
        Ok(self.state.lock().await.tokens.get(token_hash).copied())
    }

    async fn fetch_balance(&self, user_id: Uuid) -> Result<Option<i64>, AppError> {
        Ok(self.balance_of(user_id).await)
    }

    async fn find_product(&self, product_id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.state.lock().await.products.get(&product_id).cloned())
    }

    async fn find_payment_method(&self, user_id: Uuid) -> Result<Option<PaymentMethod>, AppError> {
        Ok(self.state.lock().await.payment_methods.get(&user_id).cloned())
    }

    async fn list_payment_method_history(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PaymentMethodHistory>, AppError> {
        let state = self.state.lock().await;
        let Some(method) = state.payment_methods.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(state
            .payment_method_history
            .iter()
            .rev()
            .filter(|h| h.payment_method_id == method.id)
            .cloned()
            .collect())
    }

    async fn list_withdrawals(&self, user_id: Option<Uuid>) -> Result<Vec<Withdrawal>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .withdrawals
            .iter()
            .rev()
            .filter(|w| user_id.is_none_or(|id| w.user_id == id))
            .cloned()
            .collect())
    }

    async fn list_recent_sales(
        &self,
        seller_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentSaleRow>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .sales
            .iter()
            .rev()
            .filter(|s| s.seller_id == seller_id)
            .take(limit as usize)
            .map(|s| RecentSaleRow {
                id: s.id,
                amount_minor: s.amount_minor,
                created_at: s.created_at,
                product_title: state
                    .products
                    .get(&s.product_id)
                    .map(|p| p.title.clone())
                    .unwrap_or_default(),
                buyer_name: s
                    .buyer_id
                    .and_then(|id| state.users.get(&id))
                    .map(|u| u.name.clone()),
            })
            .collect())
    }

    async fn list_sales_since(
        &self,
        seller_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sale>, AppError> {
        let mut sales: Vec<Sale> = self
            .state
            .lock()
            .await
            .sales
            .iter()
            .filter(|s| s.seller_id == seller_id && s.created_at >= since)
            .cloned()
            .collect();
        sales.sort_by_key(|s| s.created_at);
        Ok(sales)
    }

    async fn list_purchases(&self, buyer_id: Uuid) -> Result<Vec<Purchase>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .sales
            .iter()
            .rev()
            .filter(|s| s.buyer_id == Some(buyer_id))
            .filter_map(|s| {
                let product = state.products.get(&s.product_id)?;
                let seller = state.users.get(&s.seller_id)?;
                Some(Purchase {
                    id: s.id,
                    product_id: s.product_id,
                    product_title: product.title.clone(),
                    file_url: product.file_url.clone(),
                    seller_name: seller.name.clone(),
                    amount_minor: s.amount_minor,
                    status: s.status.clone(),
                    created_at: s.created_at,
                })
            })
            .collect())
    }

    async fn purchase_stats(&self, buyer_id: Uuid) -> Result<PurchaseStats, AppError> {
        let state = self.state.lock().await;
        let (count, total) = state
            .sales
            .iter()
            .filter(|s| s.buyer_id == Some(buyer_id))
            .fold((0, 0), |(count, total), s| (count + 1, total + s.amount_minor));
        Ok(PurchaseStats {
            total_purchases: count,
            total_spent_minor: total,
        })
    }

    async fn list_ledger_entries(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, AppError> {
        let state = self.state.lock().await;
        // Insertion index stands in for the `seq` column
        let mut entries: Vec<(usize, &LedgerEntry)> = state
            .ledger
            .iter()
            .enumerate()
            .filter(|(_, e)| e.user_id == user_id)
            .collect();
        entries.sort_by(|(ai, a), (bi, b)| (b.created_at, bi).cmp(&(a.created_at, ai)));
        Ok(entries
            .into_iter()
            .take(limit as usize)
            .map(|(_, e)| e.clone())
            .collect())
    }
}

#[async_trait]
impl<'a> LedgerTx for MemoryTx<'a> {
    async fn lock_balance(&mut self, user_id: Uuid) -> Result<Option<i64>, AppError> {
        Ok(self.working.users.get(&user_id).map(|u| u.balance_minor))
    }

    async fn adjust_balance(
        &mut self,
        user_id: Uuid,
        delta_minor: i64,
    ) -> Result<Option<i64>, AppError> {
        Ok(self.working.users.get_mut(&user_id).map(|u| {
            u.balance_minor += delta_minor;
            u.balance_minor
        }))
    }

    async fn debit_balance_if_covered(
        &mut self,
        user_id: Uuid,
        amount_minor: i64,
    ) -> Result<Option<i64>, AppError> {
        Ok(self
            .working
            .users
            .get_mut(&user_id)
            .filter(|u| u.balance_minor >= amount_minor)
            .map(|u| {
                u.balance_minor -= amount_minor;
                u.balance_minor
            }))
    }

    async fn set_balance(&mut self, user_id: Uuid, balance_minor: i64) -> Result<(), AppError> {
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.balance_minor = balance_minor;
        }
        Ok(())
    }

    async fn sum_sales(&mut self, seller_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .working
            .sales
            .iter()
            .filter(|s| s.seller_id == seller_id)
            .map(|s| s.amount_minor)
            .sum())
    }

    async fn sum_outstanding_withdrawals(&mut self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .working
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id && w.status.counts_against_balance())
            .map(|w| w.amount_minor)
            .sum())
    }

    async fn find_payment_method(
        &mut self,
        user_id: Uuid,
    ) -> Result<Option<PaymentMethod>, AppError> {
        Ok(self.working.payment_methods.get(&user_id).cloned())
    }

    async fn upsert_payment_method(
        &mut self,
        user_id: Uuid,
        details: &PaymentDetails,
        is_default: bool,
    ) -> Result<PaymentMethod, AppError> {
        let now = Utc::now();
        let method = self
            .working
            .payment_methods
            .entry(user_id)
            .and_modify(|m| {
                m.details = details.clone();
                m.is_default = is_default;
                m.updated_at = now;
            })
            .or_insert_with(|| PaymentMethod {
                id: Uuid::new_v4(),
                user_id,
                details: details.clone(),
                is_default,
                created_at: now,
                updated_at: now,
            });
        Ok(method.clone())
    }

    async fn insert_payment_method_history(
        &mut self,
        payment_method_id: Uuid,
        details: &PaymentDetails,
    ) -> Result<PaymentMethodHistory, AppError> {
        let entry = PaymentMethodHistory {
            id: Uuid::new_v4(),
            payment_method_id,
            details: details.clone(),
            created_at: Utc::now(),
        };
        self.working.payment_method_history.push(entry.clone());
        Ok(entry)
    }

    async fn find_sale_by_gateway_payment_id(
        &mut self,
        gateway_payment_id: &str,
    ) -> Result<Option<Sale>, AppError> {
        Ok(self
            .working
            .sales
            .iter()
            .find(|s| s.gateway_payment_id == gateway_payment_id)
            .cloned())
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<Option<Sale>, AppError> {
        if self
            .working
            .sales
            .iter()
            .any(|s| s.gateway_payment_id == sale.gateway_payment_id)
        {
            return Ok(None);
        }

        let sale = Sale {
            id: Uuid::new_v4(),
            product_id: sale.product_id,
            seller_id: sale.seller_id,
            buyer_id: sale.buyer_id,
            amount_minor: sale.amount_minor,
            gateway_payment_id: sale.gateway_payment_id.clone(),
            status: "completed".to_string(),
            created_at: Utc::now(),
        };
        self.working.sales.push(sale.clone());
        Ok(Some(sale))
    }

    async fn insert_withdrawal(
        &mut self,
        withdrawal: &NewWithdrawal,
    ) -> Result<Withdrawal, AppError> {
        let now = Utc::now();
        let withdrawal = Withdrawal {
            id: Uuid::new_v4(),
            user_id: withdrawal.user_id,
            amount_minor: withdrawal.amount_minor,
            status: WithdrawalStatus::Pending,
            bank_details: withdrawal.bank_details.clone(),
            transaction_details: None,
            created_at: now,
            updated_at: now,
        };
        self.working.withdrawals.push(withdrawal.clone());
        Ok(withdrawal)
    }

    async fn lock_withdrawal(
        &mut self,
        withdrawal_id: Uuid,
    ) -> Result<Option<Withdrawal>, AppError> {
        Ok(self
            .working
            .withdrawals
            .iter()
            .find(|w| w.id == withdrawal_id)
            .cloned())
    }

    async fn update_withdrawal_status(
        &mut self,
        withdrawal_id: Uuid,
        status: WithdrawalStatus,
        transaction_details: Option<&TransactionDetails>,
    ) -> Result<Withdrawal, AppError> {
        let withdrawal = self
            .working
            .withdrawals
            .iter_mut()
            .find(|w| w.id == withdrawal_id)
            .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
        withdrawal.status = status;
        withdrawal.transaction_details = transaction_details.cloned();
        withdrawal.updated_at = Utc::now();
        Ok(withdrawal.clone())
    }

    async fn delete_withdrawal(&mut self, withdrawal_id: Uuid) -> Result<(), AppError> {
        self.working.withdrawals.retain(|w| w.id != withdrawal_id);
        Ok(())
    }

    async fn insert_ledger_entry(
        &mut self,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntry, AppError> {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            kind: entry.kind,
            amount_minor: entry.amount_minor,
            balance_after_minor: entry.balance_after_minor,
            reference_id: entry.reference_id,
            created_at: self.now,
        };
        self.working.ledger.push(entry.clone());
        Ok(entry)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTx {
            mut guard,
            working,
            fail_commit,
            commits,
            now: _,
        } = *self;

        if fail_commit {
            return Err(AppError::Database(sqlx::Error::Protocol(
                "commit aborted by fault injection".to_string(),
            )));
        }

        *guard = working;
        commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
