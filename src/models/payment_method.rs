//! Payout destinations (bank account or UPI id).
//!
//! A user has at most one live payment method. Every change appends a
//! `PaymentMethodHistory` row, and every withdrawal keeps its own frozen copy
//! of the details that were live when it was requested.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Discriminator for the two supported payout rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodType {
    Bank,
    Upi,
}

impl PaymentMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethodType::Bank => "bank",
            PaymentMethodType::Upi => "upi",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_number: String,
    pub account_name: String,
    pub bank_name: String,
    pub ifsc_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpiDetails {
    pub upi_id: String,
}

/// Structured payout details, tagged by rail.
///
/// Stored as JSONB in the form `{"type": "bank", "details": {...}}`. This is
/// also the shape of the `bank_details` snapshot on a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "lowercase")]
pub enum PaymentDetails {
    Bank(BankDetails),
    Upi(UpiDetails),
}

impl PaymentDetails {
    /// Build details from the request's discriminator and untyped payload.
    pub fn from_parts(
        method_type: PaymentMethodType,
        details: serde_json::Value,
    ) -> Result<Self, AppError> {
        let parsed = match method_type {
            PaymentMethodType::Bank => serde_json::from_value(details).map(PaymentDetails::Bank),
            PaymentMethodType::Upi => serde_json::from_value(details).map(PaymentDetails::Upi),
        };

        parsed.map_err(|e| {
            AppError::InvalidRequest(format!("Invalid {} details: {}", method_type.as_str(), e))
        })
    }

    pub fn method_type(&self) -> PaymentMethodType {
        match self {
            PaymentDetails::Bank(_) => PaymentMethodType::Bank,
            PaymentDetails::Upi(_) => PaymentMethodType::Upi,
        }
    }

    /// Field-level validation.
    ///
    /// # Rules
    ///
    /// - bank: account number ≥ 10 chars, account name ≥ 2, bank name ≥ 2, IFSC exactly 11
    /// - upi: UPI id ≥ 5 chars
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            PaymentDetails::Bank(bank) => {
                if bank.account_number.trim().chars().count() < 10 {
                    return Err(AppError::InvalidRequest(
                        "Account number must be at least 10 characters".to_string(),
                    ));
                }
                if bank.account_name.trim().chars().count() < 2 {
                    return Err(AppError::InvalidRequest(
                        "Account name must be at least 2 characters".to_string(),
                    ));
                }
                if bank.bank_name.trim().chars().count() < 2 {
                    return Err(AppError::InvalidRequest(
                        "Bank name must be at least 2 characters".to_string(),
                    ));
                }
                if bank.ifsc_code.trim().chars().count() != 11 {
                    return Err(AppError::InvalidRequest(
                        "IFSC code must be 11 characters".to_string(),
                    ));
                }
            }
            PaymentDetails::Upi(upi) => {
                if upi.upi_id.trim().chars().count() < 5 {
                    return Err(AppError::InvalidRequest(
                        "UPI ID must be at least 5 characters".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// The live payout destination of a user.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub details: PaymentDetails,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable entry of the payment method audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodHistory {
    pub id: Uuid,
    pub payment_method_id: Uuid,
    pub details: PaymentDetails,
    pub created_at: DateTime<Utc>,
}

/// Request body for `PUT /api/v1/payment-method`.
///
/// ```json
/// {
///   "type": "upi",
///   "details": { "upi_id": "seller@okbank" },
///   "is_default": true
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct UpsertPaymentMethodRequest {
    #[serde(rename = "type")]
    pub method_type: PaymentMethodType,

    pub details: serde_json::Value,

    #[serde(default)]
    pub is_default: bool,
}
