//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request and response bodies built on top of them.

/// Balance request/response types
pub mod account;
/// Bearer token authentication model
pub mod api_token;
/// Append-only balance journal
pub mod ledger_entry;
/// Bank and UPI payout destinations
pub mod payment_method;
pub mod product;
pub mod sale;
/// Withdrawal lifecycle model
pub mod withdrawal;
