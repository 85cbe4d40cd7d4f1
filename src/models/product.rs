//! Product lookup model.
//!
//! Catalog management lives elsewhere; checkout only needs to know who sells
//! a product, what it costs and where the download lives.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,

    /// List price in minor units (paise)
    pub price_minor: i64,

    pub file_url: Option<String>,

    /// Hidden products cannot be ordered
    pub is_visible: bool,

    pub created_at: DateTime<Utc>,
}
