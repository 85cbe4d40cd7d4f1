//! Seller reporting and buyer purchase history handlers.

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        ledger_entry::{LedgerEntry, LedgerQuery},
        sale::{
            Purchase, PurchaseStats, RecentSaleResponse, RecentSalesQuery, SalesBucket,
            SalesReportQuery,
        },
    },
    services::{ledger_service, sale_service},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

/// `GET /api/v1/sales/recent?limit=10`
///
/// Latest sales of the caller, newest first. Guest purchases show the buyer
/// as "Anonymous".
pub async fn recent_sales(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RecentSalesQuery>,
) -> Result<Json<Vec<RecentSaleResponse>>, AppError> {
    let sales = sale_service::recent_sales(state.store.as_ref(), auth.user_id, query.limit).await?;
    Ok(Json(sales))
}

/// `GET /api/v1/sales/report?timeframe=day|month|year`
///
/// Caller's sales bucketed by UTC day (last 30 days), month (last 12 months)
/// or year (last 5 years), oldest bucket first.
///
/// # Response
///
/// ```json
/// [
///   {"date": "2025-01-15", "amount_minor": 150000, "transactions": 3, "unique_customers": 2}
/// ]
/// ```
pub async fn sales_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SalesReportQuery>,
) -> Result<Json<Vec<SalesBucket>>, AppError> {
    let buckets =
        sale_service::sales_report(state.store.as_ref(), auth.user_id, query.timeframe).await?;
    Ok(Json(buckets))
}

/// `GET /api/v1/purchases`
///
/// Everything the caller bought, newest first, with download links.
pub async fn purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Purchase>>, AppError> {
    let purchases = sale_service::purchases(state.store.as_ref(), auth.user_id).await?;
    Ok(Json(purchases))
}

/// `GET /api/v1/purchases/stats`
pub async fn purchase_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<PurchaseStats>, AppError> {
    let stats = sale_service::purchase_stats(state.store.as_ref(), auth.user_id).await?;
    Ok(Json(stats))
}

/// `GET /api/v1/ledger?limit=50`
///
/// Latest balance journal entries of the caller, newest first.
pub async fn ledger_entries(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    let entries =
        ledger_service::list_entries(state.store.as_ref(), auth.user_id, query.limit).await?;
    Ok(Json(entries))
}
