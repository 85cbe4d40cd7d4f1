//! Account balance API types.
//!
//! The balance itself lives on the `users` row as `balance_minor`, a cache
//! over sales and withdrawals kept in minor units (paise) to avoid
//! floating-point drift. For example 100.00 INR is stored as 10000.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query string for `GET /api/v1/balance`.
///
/// `user_id` defaults to the authenticated user.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub user_id: Option<Uuid>,
}

/// Response body for the balance endpoint.
///
/// ```json
/// {
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "balance_minor": 35000,
///   "currency": "INR"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub balance_minor: i64,
    pub currency: String,
}
