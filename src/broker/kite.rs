//! Zerodha Kite Connect REST adapter (native Rust, no external SDK dependency).
//!
//! Only the calls the listing-day trade needs: place order, read order
//! history, check the profile, and exchange a request token for an access
//! token.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::BrokerClient;
use crate::config::BrokerConfig;
use crate::domain::{BrokerOrderStatus, OrderRequest, OrderSide, OrderStatusReport};
use crate::error::{OrderError, Result, TraderError};

const KITE_VERSION: &str = "3";
/// Kite caps order tags at 20 characters
const MAX_TAG_LEN: usize = 20;

/// Standard Kite response envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderHistoryEntry {
    order_id: String,
    status: String,
    #[serde(default)]
    average_price: Option<Decimal>,
    #[serde(default)]
    status_message: Option<String>,
}

#[derive(Clone)]
pub struct KiteClient {
    http: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    exchange: String,
    product: String,
}

impl KiteClient {
    pub fn new(config: &BrokerConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent("ipo-trader/0.1")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TraderError::Internal(format!("failed to build Kite HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            exchange: config.exchange.clone(),
            product: config.product.clone(),
        })
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| TraderError::Auth("Kite access token is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-kite-version"),
            HeaderValue::from_static(KITE_VERSION),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("token {}:{}", self.api_key, token))
                .map_err(|e| TraderError::Auth(format!("invalid Kite auth header: {}", e)))?,
        );
        Ok(headers)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, String)]>,
        require_auth: bool,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method.clone(), &url);

        if require_auth {
            req = req.headers(self.auth_headers()?);
        } else {
            req = req.header("X-Kite-Version", KITE_VERSION);
        }

        if let Some(form) = form {
            req = req.form(form);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.as_u16() == 429 {
            return Err(TraderError::RateLimited(format!(
                "Kite API rate limited for {} {}",
                method, path
            )));
        }

        Self::parse_envelope(status.as_u16(), &text)
            .map_err(|e| match e {
                TraderError::Internal(msg) => {
                    TraderError::Internal(format!("Kite API {} {}: {}", method, path, msg))
                }
                other => other,
            })
    }

    /// Unwrap `{"status": "success", "data": ...}`; anything else is an error
    fn parse_envelope(http_status: u16, body: &str) -> Result<Value> {
        let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
            TraderError::Internal(format!(
                "invalid Kite JSON response (status={}): {}",
                http_status, e
            ))
        })?;

        if envelope.status == "success" && (200..300).contains(&http_status) {
            return Ok(envelope.data);
        }

        let message = envelope.message.unwrap_or_else(|| "unknown error".to_string());
        match envelope.error_type.as_deref() {
            Some("TokenException") => Err(TraderError::Auth(message)),
            Some("InputException") | Some("OrderException") | Some("MarginException") => {
                Err(TraderError::OrderRejected(message))
            }
            _ => Err(TraderError::Internal(format!(
                "status={} error={}",
                http_status, message
            ))),
        }
    }

    /// Form fields for `POST /orders/regular`
    fn order_form(&self, request: &OrderRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("tradingsymbol", request.symbol.clone()),
            ("exchange", self.exchange.clone()),
            (
                "transaction_type",
                match request.side {
                    OrderSide::Buy => "BUY".to_string(),
                    OrderSide::Sell => "SELL".to_string(),
                },
            ),
            ("order_type", request.order_type.as_str().to_string()),
            ("quantity", request.quantity.to_string()),
            ("product", self.product.clone()),
            ("validity", "DAY".to_string()),
            (
                "tag",
                request
                    .client_order_id
                    .chars()
                    .take(MAX_TAG_LEN)
                    .collect::<String>(),
            ),
        ];

        if let Some(price) = request.price {
            form.push(("price", price.normalize().to_string()));
        }
        if let Some(trigger) = request.trigger_price {
            form.push(("trigger_price", trigger.normalize().to_string()));
        }
        form
    }

    /// Most recent entry of an order's status history
    fn latest_status(order_id: &str, data: &Value) -> Result<OrderStatusReport> {
        let history: Vec<OrderHistoryEntry> = serde_json::from_value(data.clone())?;
        let latest = history.into_iter().last().ok_or_else(|| OrderError::NotFound {
            order_id: order_id.to_string(),
        })?;

        Ok(OrderStatusReport {
            order_id: latest.order_id,
            status: BrokerOrderStatus::parse(&latest.status),
            average_price: latest.average_price,
            status_message: latest.status_message,
        })
    }

    /// SHA-256 of api_key + request_token + api_secret, hex encoded
    pub fn session_checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(api_key.as_bytes());
        hasher.update(request_token.as_bytes());
        hasher.update(api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Exchange a login request token for an access token
    pub async fn generate_session(&self, request_token: &str, api_secret: &str) -> Result<String> {
        let form = [
            ("api_key", self.api_key.clone()),
            ("request_token", request_token.to_string()),
            (
                "checksum",
                Self::session_checksum(&self.api_key, request_token, api_secret),
            ),
        ];

        let data = self
            .request(Method::POST, "/session/token", Some(&form), false)
            .await?;

        let token = data
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| TraderError::Auth("session response missing access_token".to_string()))?;

        info!("Kite session generated");
        Ok(token.to_string())
    }
}

#[async_trait]
impl BrokerClient for KiteClient {
    async fn has_valid_session(&self) -> bool {
        if self.access_token.is_none() {
            return false;
        }

        match self.request(Method::GET, "/user/profile", None, true).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Kite session check failed: {}", e);
                false
            }
        }
    }

    #[instrument(skip(self, request), fields(kind = %request.kind, symbol = %request.symbol, qty = request.quantity))]
    async fn place_order(&self, request: &OrderRequest) -> Result<String> {
        let form = self.order_form(request);
        let data = self
            .request(Method::POST, "/orders/regular", Some(&form), true)
            .await
            .map_err(|e| match e {
                TraderError::OrderRejected(reason) => TraderError::from(OrderError::Rejected {
                    kind: request.kind.to_string(),
                    symbol: request.symbol.clone(),
                    reason,
                }),
                other => other,
            })?;

        let order_id = data
            .get("order_id")
            .and_then(Value::as_str)
            .ok_or(OrderError::MissingOrderId)?
            .to_string();

        debug!(%order_id, "Kite order accepted");
        Ok(order_id)
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatusReport> {
        let path = format!("/orders/{}", order_id);
        let data = self.request(Method::GET, &path, None, true).await?;
        Self::latest_status(order_id, &data)
    }
}
