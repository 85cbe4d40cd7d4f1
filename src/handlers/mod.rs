//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to a service
//! 3. Returns HTTP response (JSON, status code)

/// Withdrawal administration endpoints
pub mod admin;
pub mod health;
/// Payment method endpoints
pub mod payment_methods;
/// Checkout endpoints
pub mod payments;
/// Sales and ledger reporting endpoints
pub mod sales;
/// Balance and withdrawal endpoints
pub mod withdrawals;
