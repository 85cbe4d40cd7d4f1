//! Ledger journal models.
//!
//! Every change to a cached balance is mirrored by one journal entry written
//! in the same database transaction. The journal is append-only.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What caused a balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    /// Seller credited for a verified sale
    SaleCredit,
    /// Owner debited when requesting a withdrawal
    WithdrawalDebit,
    /// Owner refunded when a withdrawal is rejected or deleted
    WithdrawalRefund,
    /// Cached balance overwritten by a recomputation from history
    Reconciliation,
}

impl LedgerEntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEntryKind::SaleCredit => "sale_credit",
            LedgerEntryKind::WithdrawalDebit => "withdrawal_debit",
            LedgerEntryKind::WithdrawalRefund => "withdrawal_refund",
            LedgerEntryKind::Reconciliation => "reconciliation",
        }
    }
}

impl FromStr for LedgerEntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale_credit" => Ok(LedgerEntryKind::SaleCredit),
            "withdrawal_debit" => Ok(LedgerEntryKind::WithdrawalDebit),
            "withdrawal_refund" => Ok(LedgerEntryKind::WithdrawalRefund),
            "reconciliation" => Ok(LedgerEntryKind::Reconciliation),
            other => Err(format!("unknown ledger entry kind: {}", other)),
        }
    }
}

/// A journal entry.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: LedgerEntryKind,

    /// Signed change applied to the balance, in minor units
    pub amount_minor: i64,

    /// Cached balance right after the change
    pub balance_after_minor: i64,

    /// Sale or withdrawal that caused the change. NULL for reconciliation.
    pub reference_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Insert payload for a journal entry.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: Uuid,
    pub kind: LedgerEntryKind,
    pub amount_minor: i64,
    pub balance_after_minor: i64,
    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}
