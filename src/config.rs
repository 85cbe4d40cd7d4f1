//! Application configuration management.
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file) and deserialized with `envy` into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `RAZORPAY_KEY_ID` / `RAZORPAY_KEY_SECRET` (required): gateway credentials
/// - `RAZORPAY_BASE_URL` (optional): gateway API root
/// - `PAYMENT_CURRENCY` (optional): ISO 4217 code for orders, defaults to INR
/// - `ADMIN_TOKEN` (optional): admin capability; admin routes reject everything when unset
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    pub razorpay_key_id: String,

    pub razorpay_key_secret: String,

    #[serde(default = "default_razorpay_base_url")]
    pub razorpay_base_url: String,

    #[serde(default = "default_currency")]
    pub payment_currency: String,

    #[serde(default)]
    pub admin_token: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_razorpay_base_url() -> String {
    "https://api.razorpay.com/v1/".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value cannot be
    /// parsed into the expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Does nothing if no .env file exists
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }
}
