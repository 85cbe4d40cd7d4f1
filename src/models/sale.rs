//! Sale records and checkout request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed purchase of a product.
///
/// # Database Table
///
/// Maps to the `sales` table. Rows are written once, together with the
/// seller's balance credit, and never updated or deleted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Sale {
    pub id: Uuid,
    pub product_id: Uuid,
    pub seller_id: Uuid,

    /// NULL for anonymous (guest) purchases
    pub buyer_id: Option<Uuid>,

    /// Gateway-verified amount in minor units (paise)
    pub amount_minor: i64,

    /// Gateway payment id, unique per sale
    pub gateway_payment_id: String,

    /// Always "completed"
    pub status: String,

    pub created_at: DateTime<Utc>,
}

/// Insert payload for a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub amount_minor: i64,
    pub gateway_payment_id: String,
}

/// Outcome of a recorded sale, returned to the buyer.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedSale {
    pub sale_id: Uuid,
    pub file_url: Option<String>,
}

/// Row of the seller's recent-sales listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecentSaleRow {
    pub id: Uuid,
    pub amount_minor: i64,
    pub created_at: DateTime<Utc>,
    pub product_title: String,
    pub buyer_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecentSaleResponse {
    pub id: Uuid,
    pub amount_minor: i64,
    pub created_at: DateTime<Utc>,
    pub product_title: String,
    pub buyer_name: String,
}

impl From<RecentSaleRow> for RecentSaleResponse {
    fn from(row: RecentSaleRow) -> Self {
        Self {
            id: row.id,
            amount_minor: row.amount_minor,
            created_at: row.created_at,
            product_title: row.product_title,
            buyer_name: row.buyer_name.unwrap_or_else(|| "Anonymous".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentSalesQuery {
    pub limit: Option<i64>,
}

/// Bucket width of the seller sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalesTimeframe {
    /// Daily buckets over the last 30 days
    Day,
    /// Monthly buckets over the last 12 months
    Month,
    /// Yearly buckets over the last 5 years
    Year,
}

impl SalesTimeframe {
    /// `chrono` format of a bucket key, e.g. `2025-01-15`, `2025-01`, `2025`.
    pub fn key_format(&self) -> &'static str {
        match self {
            SalesTimeframe::Day => "%Y-%m-%d",
            SalesTimeframe::Month => "%Y-%m",
            SalesTimeframe::Year => "%Y",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SalesReportQuery {
    pub timeframe: SalesTimeframe,
}

/// One bucket of the sales report.
///
/// Guest purchases count together as a single customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesBucket {
    pub date: String,
    pub amount_minor: i64,
    pub transactions: i64,
    pub unique_customers: i64,
}

/// A purchase as seen by its buyer.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Purchase {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_title: String,
    pub file_url: Option<String>,
    pub seller_name: String,
    pub amount_minor: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// ```json
/// { "total_purchases": 3, "total_spent_minor": 149700 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct PurchaseStats {
    pub total_purchases: i64,
    pub total_spent_minor: i64,
}

/// Request body for `POST /api/v1/payments/orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
}

/// Request body for `POST /api/v1/payments/verify`.
///
/// ```json
/// {
///   "gateway_order_id": "order_N5d1...",
///   "gateway_payment_id": "pay_N5d2...",
///   "gateway_signature": "9f2c...",
///   "product_id": "550e8400-e29b-41d4-a716-446655440000",
///   "seller_id": "660e8400-e29b-41d4-a716-446655440001"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub product_id: Uuid,
    pub seller_id: Uuid,
}
