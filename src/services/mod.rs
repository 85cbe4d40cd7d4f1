//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the atomic units, validation and logging of every operation.

pub mod balance_service;
pub mod checkout_service;
pub mod ledger_service;
pub mod payment_gateway;
pub mod payment_method_service;
pub mod sale_service;
pub mod withdrawal_service;
