//! NSE public IPO API client.
//!
//! `ipo-current-issue` lists open/recent issues; `ipo-detail?symbol=` carries
//! the per-category bid multiples. Both are loosely typed, so every field is
//! parsed leniently: unparseable numbers become zero and unparseable dates
//! become unknown.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::MarketDataSource;
use crate::config::MarketDataConfig;
use crate::domain::{BidCategory, IpoListing, SubscriptionDetail};
use crate::error::{Result, TraderError};

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[derive(Clone)]
pub struct NseClient {
    http: Client,
    list_url: String,
    detail_url: String,
}

impl NseClient {
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TraderError::Internal(format!("failed to build NSE HTTP client: {}", e)))?;

        Ok(Self {
            http,
            list_url: config.ipo_list_url.clone(),
            detail_url: config.ipo_detail_url.clone(),
        })
    }

    fn pick_str<'a>(root: &'a Value, key: &str) -> Option<&'a str> {
        root.get(key).and_then(Value::as_str)
    }

    /// Rows of the current-issue listing; rows without a company are dropped
    pub fn parse_ipo_list(body: &Value) -> Result<Vec<IpoListing>> {
        let items = body
            .as_array()
            .or_else(|| body.get("data").and_then(Value::as_array))
            .ok_or_else(|| {
                TraderError::InvalidMarketData("IPO list is not a JSON array".to_string())
            })?;

        Ok(items
            .iter()
            .filter_map(|item| {
                let company = Self::pick_str(item, "companyName")?.trim();
                if company.is_empty() {
                    return None;
                }
                Some(IpoListing {
                    company: company.to_string(),
                    symbol: Self::pick_str(item, "symbol").unwrap_or("").trim().to_string(),
                    open_date: Self::pick_str(item, "issueStartDate").and_then(parse_nse_date),
                    close_date: Self::pick_str(item, "issueEndDate").and_then(parse_nse_date),
                    issue_price: Self::pick_str(item, "issuePrice").and_then(parse_price_band),
                    subscription_multiple: item.get("noOfTime").map(parse_multiple).unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Category multiples from an `ipo-detail` payload
    pub fn parse_subscription_detail(body: &Value) -> SubscriptionDetail {
        let mut detail = SubscriptionDetail::default();

        let bids = body
            .get("bidDetails")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for bid in bids {
            let label = Self::pick_str(bid, "category").unwrap_or("");
            if let Some(category) = classify_category(label) {
                let multiple = bid.get("noOfTime").map(parse_multiple).unwrap_or_default();
                detail.set(category, multiple);
            }
        }
        detail
    }
}

#[async_trait]
impl MarketDataSource for NseClient {
    #[instrument(skip(self))]
    async fn fetch_current_ipo_list(&self) -> Result<Vec<IpoListing>> {
        let resp = self.http.get(&self.list_url).send().await?.error_for_status()?;
        let body: Value = resp.json().await?;
        let listings = Self::parse_ipo_list(&body)?;

        info!("Fetched {} current IPOs from NSE", listings.len());
        Ok(listings)
    }

    #[instrument(skip(self))]
    async fn fetch_subscription_detail(&self, symbol: &str) -> Result<Option<SubscriptionDetail>> {
        let resp = self
            .http
            .get(&self.detail_url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "No subscription detail");
            return Ok(None);
        }

        let body: Value = resp.json().await?;
        Ok(Some(Self::parse_subscription_detail(&body)))
    }
}

/// Dates like `04-Feb-2026`, `04-February-2026` or `2026-02-04`; `-` is unknown
pub fn parse_nse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return None;
    }

    ["%d-%b-%Y", "%d-%B-%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Multiples like `"12.34"`, `"1,234.5x"`, `3.2`; anything unreadable is 0
pub fn parse_multiple(value: &Value) -> Decimal {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Decimal::ZERO,
    };

    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | 'x' | 'X'))
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return Decimal::ZERO;
    }

    Decimal::from_str(&cleaned)
        .map(|d| d.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

/// Upper end of a band like `Rs.95 to Rs.100` or `Rs 280-295`
pub fn parse_price_band(raw: &str) -> Option<Decimal> {
    raw.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| Decimal::from_str(token).ok())
        .filter(|price| *price > Decimal::ZERO)
        .max()
}

/// Map an NSE bid-category label onto the five-category taxonomy
pub fn classify_category(label: &str) -> Option<BidCategory> {
    let label = label.trim().to_lowercase();

    if label.contains("qualified institutional") || label.starts_with("qib") {
        Some(BidCategory::Qib)
    } else if label.contains("non institutional")
        && !label.contains("more than")
        && !label.contains("less than")
    {
        Some(BidCategory::Nii)
    } else if label.contains("more than ten lakh") || label.contains("shni") {
        Some(BidCategory::Snii)
    } else if label.contains("less than ten lakh") || label.contains("bhni") {
        Some(BidCategory::Bnii)
    } else if label.contains("retail") {
        Some(BidCategory::Retail)
    } else {
        None
    }
}
