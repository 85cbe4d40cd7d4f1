//! Router assembly and shared handler state.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers,
    middleware::auth::{self, hash_token},
    services::payment_gateway::PaymentGateway,
    store::LedgerStore,
};

/// State shared by every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub gateway: Arc<dyn PaymentGateway>,

    /// SHA-256 of the configured admin token; `None` disables admin routes
    pub admin_token_hash: Option<String>,

    /// Currency of balances and gateway orders
    pub currency: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        gateway: Arc<dyn PaymentGateway>,
        admin_token: Option<&str>,
        currency: String,
    ) -> Self {
        Self {
            store,
            gateway,
            admin_token_hash: admin_token.filter(|t| !t.is_empty()).map(hash_token),
            currency,
        }
    }
}

/// Build the HTTP application.
pub fn router(state: AppState) -> Router {
    // Seller routes (bearer token required)
    let user_routes = Router::new()
        .route("/api/v1/balance", get(handlers::withdrawals::get_balance))
        .route(
            "/api/v1/withdrawals",
            get(handlers::withdrawals::list_withdrawals)
                .post(handlers::withdrawals::request_withdrawal),
        )
        .route(
            "/api/v1/withdrawals/{id}",
            delete(handlers::withdrawals::delete_withdrawal),
        )
        .route(
            "/api/v1/payment-method",
            get(handlers::payment_methods::get_payment_method)
                .put(handlers::payment_methods::upsert_payment_method),
        )
        .route(
            "/api/v1/payment-method/history",
            get(handlers::payment_methods::payment_method_history),
        )
        .route("/api/v1/sales/recent", get(handlers::sales::recent_sales))
        .route("/api/v1/sales/report", get(handlers::sales::sales_report))
        .route("/api/v1/purchases", get(handlers::sales::purchases))
        .route("/api/v1/purchases/stats", get(handlers::sales::purchase_stats))
        .route("/api/v1/ledger", get(handlers::sales::ledger_entries))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Checkout routes (guests allowed)
    let checkout_routes = Router::new()
        .route(
            "/api/v1/payments/orders",
            post(handlers::payments::create_order),
        )
        .route(
            "/api/v1/payments/verify",
            post(handlers::payments::verify_payment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::optional_auth_middleware,
        ));

    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/withdrawals",
            get(handlers::admin::list_withdrawals),
        )
        .route(
            "/api/v1/admin/withdrawals/{id}",
            patch(handlers::admin::update_withdrawal_status),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::admin_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(user_routes)
        .merge(checkout_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
