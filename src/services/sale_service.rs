//! Sale recording, seller sales reporting and buyer purchase history.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::sale::{
        NewSale, Purchase, PurchaseStats, RecentSaleResponse, RecordedSale, Sale, SalesBucket,
        SalesTimeframe,
    },
    services::ledger_service,
    store::LedgerStore,
};

const DEFAULT_RECENT_LIMIT: i64 = 10;

/// A gateway-verified purchase, ready to be recorded.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Option<Uuid>,
    pub amount_minor: i64,
    pub gateway_payment_id: String,
}

/// Record a sale and credit the seller in one atomic unit.
///
/// Idempotent on `gateway_payment_id`: replaying a verified payment returns
/// the sale recorded the first time and credits nothing. A replay that names
/// a different product or seller than the recorded sale is rejected.
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero or negative
/// - `NotFound`: product doesn't exist
/// - `InvalidRequest`: `seller_id` does not own the product, or the payment
///   was already recorded for another product
pub async fn record_sale(
    store: &dyn LedgerStore,
    request: SaleRequest,
) -> Result<RecordedSale, AppError> {
    if request.amount_minor <= 0 {
        return Err(AppError::InvalidAmount(request.amount_minor.to_string()));
    }

    let product = store
        .find_product(request.product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    if product.seller_id != request.seller_id {
        tracing::warn!(
            product_id = %request.product_id,
            seller_id = %request.seller_id,
            "Sale seller does not own product"
        );
        return Err(AppError::InvalidRequest(
            "Seller does not own this product".to_string(),
        ));
    }

    let mut tx = store.begin().await?;

    let inserted = tx
        .insert_sale(&NewSale {
            product_id: request.product_id,
            seller_id: request.seller_id,
            buyer_id: request.buyer_id,
            amount_minor: request.amount_minor,
            gateway_payment_id: request.gateway_payment_id.clone(),
        })
        .await?;

    let Some(sale) = inserted else {
        let existing = tx
            .find_sale_by_gateway_payment_id(&request.gateway_payment_id)
            .await?
            .ok_or(AppError::NotFound("Sale"))?;

        if existing.product_id != request.product_id || existing.seller_id != request.seller_id {
            tracing::warn!(
                sale_id = %existing.id,
                gateway_payment_id = %request.gateway_payment_id,
                product_id = %request.product_id,
                "Payment replayed for a different product"
            );
            return Err(AppError::InvalidRequest(
                "Payment was recorded for a different product".to_string(),
            ));
        }

        tracing::info!(
            sale_id = %existing.id,
            gateway_payment_id = %request.gateway_payment_id,
            "Payment already recorded"
        );
        return Ok(RecordedSale {
            sale_id: existing.id,
            file_url: product.file_url,
        });
    };

    let balance_after =
        ledger_service::credit_on_sale(tx.as_mut(), sale.seller_id, sale.amount_minor, sale.id)
            .await?;

    tx.commit().await?;

    tracing::info!(
        sale_id = %sale.id,
        seller_id = %sale.seller_id,
        amount_minor = sale.amount_minor,
        balance_after,
        "Sale recorded"
    );

    Ok(RecordedSale {
        sale_id: sale.id,
        file_url: product.file_url,
    })
}

/// Latest sales of a seller, newest first.
///
/// # Errors
///
/// - `InvalidRequest`: limit outside 1..=100
pub async fn recent_sales(
    store: &dyn LedgerStore,
    seller_id: Uuid,
    limit: Option<i64>,
) -> Result<Vec<RecentSaleResponse>, AppError> {
    let limit = ledger_service::page_limit(limit, DEFAULT_RECENT_LIMIT)?;
    let rows = store.list_recent_sales(seller_id, limit).await?;
    Ok(rows.into_iter().map(RecentSaleResponse::from).collect())
}

/// Sales of a seller grouped into day, month or year buckets (UTC), oldest
/// bucket first. Empty buckets are omitted.
///
/// | Timeframe | Window                                |
/// |-----------|---------------------------------------|
/// | day       | the last 30 days                      |
/// | month     | from the 1st of the month a year ago  |
/// | year      | from January 1st five years ago       |
pub async fn sales_report(
    store: &dyn LedgerStore,
    seller_id: Uuid,
    timeframe: SalesTimeframe,
) -> Result<Vec<SalesBucket>, AppError> {
    let since = window_start(timeframe, Utc::now())?;
    let sales = store.list_sales_since(seller_id, since).await?;
    Ok(bucket_sales(&sales, timeframe))
}

/// Everything the buyer has bought, newest first.
pub async fn purchases(store: &dyn LedgerStore, buyer_id: Uuid) -> Result<Vec<Purchase>, AppError> {
    store.list_purchases(buyer_id).await
}

pub async fn purchase_stats(
    store: &dyn LedgerStore,
    buyer_id: Uuid,
) -> Result<PurchaseStats, AppError> {
    store.purchase_stats(buyer_id).await
}

fn window_start(timeframe: SalesTimeframe, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    let today = now.date_naive();
    let start = match timeframe {
        SalesTimeframe::Day => today.checked_sub_days(Days::new(30)),
        SalesTimeframe::Month => today
            .with_day(1)
            .and_then(|d| d.checked_sub_months(Months::new(12))),
        SalesTimeframe::Year => NaiveDate::from_ymd_opt(today.year() - 5, 1, 1),
    };

    start
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| AppError::InvalidRequest("Report window out of range".to_string()))
}

/// Expects `sales` in ascending `created_at` order.
fn bucket_sales(sales: &[Sale], timeframe: SalesTimeframe) -> Vec<SalesBucket> {
    let mut buckets: Vec<(SalesBucket, HashSet<Option<Uuid>>)> = Vec::new();

    for sale in sales {
        let key = sale.created_at.format(timeframe.key_format()).to_string();
        match buckets.last_mut() {
            Some((bucket, customers)) if bucket.date == key => {
                bucket.amount_minor += sale.amount_minor;
                bucket.transactions += 1;
                customers.insert(sale.buyer_id);
            }
            _ => buckets.push((
                SalesBucket {
                    date: key,
                    amount_minor: sale.amount_minor,
                    transactions: 1,
                    unique_customers: 0,
                },
                HashSet::from([sale.buyer_id]),
            )),
        }
    }

    buckets
        .into_iter()
        .map(|(mut bucket, customers)| {
            bucket.unique_customers = customers.len() as i64;
            bucket
        })
        .collect()
}
