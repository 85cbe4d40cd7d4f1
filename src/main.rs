//! Storefront Ledger - Main Application Entry Point
//!
//! REST API for the money side of a digital-goods marketplace: seller
//! balances, payouts (withdrawals) and their administration, plus the
//! checkout flow that credits sellers when a gateway payment is verified.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Payments**: Razorpay over reqwest, HMAC-SHA256 callback signatures
//! - **Authentication**: bearer tokens with SHA-256 hashing, admin token header
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod app;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    app::AppState, services::payment_gateway::RazorpayGateway, store::postgres::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let gateway = RazorpayGateway::new(
        &config.razorpay_base_url,
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
    )?;

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; admin routes will reject every request");
    }

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(gateway),
        config.admin_token.as_deref(),
        config.payment_currency.clone(),
    );
    let app = app::router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
