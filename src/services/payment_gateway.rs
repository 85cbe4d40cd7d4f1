//! Payment gateway adapter (Razorpay).
//!
//! The gateway is the authority on how much a buyer actually paid. Checkout
//! never trusts an amount sent by the browser: it verifies the callback
//! signature and then asks the gateway for the captured amount.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::Url;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// An order created on the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    #[serde(rename = "id")]
    pub order_id: String,
    #[serde(rename = "amount")]
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to the checkout widget.
    fn key_id(&self) -> &str;

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, AppError>;

    /// Captured amount of a payment, in minor units.
    async fn fetch_payment_amount(&self, payment_id: &str) -> Result<i64, AppError>;

    /// Check the checkout callback signature for an order/payment pair.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// Razorpay REST client.
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: Url,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(base_url: &str, key_id: String, key_secret: String) -> Result<Self, url::ParseError> {
        // Url::join drops the last path segment unless the base ends in '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            key_id,
            key_secret,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InvalidRequest(format!("Invalid gateway path: {}", e)))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, AppError> {
        let order = self
            .client
            .post(self.endpoint("orders")?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount: amount_minor,
                currency,
                receipt,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<GatewayOrder>()
            .await?;

        tracing::debug!(order_id = %order.order_id, amount_minor, "Gateway order created");

        Ok(order)
    }

    async fn fetch_payment_amount(&self, payment_id: &str) -> Result<i64, AppError> {
        let payment = self
            .client
            .get(self.endpoint(&format!("payments/{}", payment_id))?)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        payment_amount(&payment)
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_hmac(&self.key_secret, order_id, payment_id, signature)
    }
}

/// Extract a usable amount from a gateway payment document.
fn payment_amount(payment: &serde_json::Value) -> Result<i64, AppError> {
    match payment.get("amount") {
        Some(amount) => match amount.as_i64() {
            Some(value) if value > 0 => Ok(value),
            _ => Err(AppError::InvalidAmount(amount.to_string())),
        },
        None => Err(AppError::InvalidAmount("missing".to_string())),
    }
}

/// HMAC-SHA256 of `"{order_id}|{payment_id}"`, compared in constant time.
fn verify_hmac(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Offline gateway for tests. Signatures are real HMACs over `secret`.
#[cfg(test)]
pub struct StubGateway {
    pub secret: String,
    pub payment_amount: serde_json::Value,
}

#[cfg(test)]
impl StubGateway {
    pub fn paying(amount_minor: i64) -> Self {
        Self {
            secret: "stub_secret".to_string(),
            payment_amount: serde_json::json!({ "amount": amount_minor }),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl PaymentGateway for StubGateway {
    fn key_id(&self) -> &str {
        "rzp_test_stub"
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, AppError> {
        Ok(GatewayOrder {
            order_id: "order_stub".to_string(),
            amount_minor,
            currency: currency.to_string(),
        })
    }

    async fn fetch_payment_amount(&self, _payment_id: &str) -> Result<i64, AppError> {
        payment_amount(&self.payment_amount)
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_hmac(&self.secret, order_id, payment_id, signature)
    }
}
