//! Withdrawal data models and API request types.
//!
//! A withdrawal moves part of a seller's balance out of the platform. The
//! amount is debited when the request is made, so every later transition is
//! either a no-op on the balance (completion) or a refund (rejection, deletion).
//!
//! # Lifecycle
//!
//! ```text
//! pending ──► processing ──► completed
//!    │             │
//!    ├─────────────┴──────► rejected   (refund)
//!    └──► deleted by owner             (refund, row removed)
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::payment_method::PaymentDetails;

/// Closed set of withdrawal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    /// Whether an administrator may move a withdrawal from `self` to `next`.
    ///
    /// `completed` and `rejected` are terminal.
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Pending, Rejected)
                | (Processing, Completed)
                | (Processing, Rejected)
        )
    }

    /// Statuses whose amount is still deducted from the balance, as far as
    /// reconciliation is concerned.
    pub fn counts_against_balance(&self) -> bool {
        matches!(self, WithdrawalStatus::Pending | WithdrawalStatus::Completed)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "processing" => Ok(WithdrawalStatus::Processing),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

/// Payout receipt attached by the administrator on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub transaction_id: String,
    pub date: String,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A withdrawal with its JSON columns already decoded.
///
/// `transaction_details` is `Some` only while `status` is `completed`.
#[derive(Debug, Clone, Serialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub status: WithdrawalStatus,
    pub bank_details: PaymentDetails,
    pub transaction_details: Option<TransactionDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a freshly requested withdrawal.
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub user_id: Uuid,
    pub amount_minor: i64,
    pub bank_details: PaymentDetails,
}

/// Request body for `POST /api/v1/withdrawals`.
///
/// ```json
/// { "amount_minor": 4000 }
/// ```
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount_minor: i64,
}

/// Request body for `PATCH /api/v1/admin/withdrawals/{id}`.
///
/// `status` stays a raw string so that unknown values surface as
/// `invalid_status` rather than a generic deserialization failure.
///
/// ```json
/// {
///   "status": "completed",
///   "transaction_details": {
///     "transaction_id": "UTR123",
///     "date": "2025-01-15",
///     "reference": "NEFT batch 7"
///   }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct UpdateWithdrawalStatusRequest {
    pub status: String,
    pub transaction_details: Option<TransactionDetails>,
}

#[derive(Debug, Serialize)]
pub struct DeleteWithdrawalResponse {
    pub success: bool,
}
