use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role of an order within one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    Entry,
    StopLoss,
    Target,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Entry => "ENTRY",
            OrderKind::StopLoss => "STOPLOSS",
            OrderKind::Target => "TARGET",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    /// Stop-loss market: triggers a market order at `trigger_price`
    StopLossMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopLossMarket => "SL-M",
        }
    }
}

/// Order request (what we want the broker to do)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub kind: OrderKind,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: u64,
    pub price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
}

impl OrderRequest {
    /// Market buy for the listing-day entry
    pub fn entry(symbol: impl Into<String>, quantity: u64) -> Self {
        Self {
            client_order_id: Uuid::new_v4().simple().to_string(),
            kind: OrderKind::Entry,
            symbol: symbol.into(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity,
            price: None,
            trigger_price: None,
        }
    }

    /// Protective SL-M sell triggered at `trigger_price`
    pub fn stop_loss(symbol: impl Into<String>, quantity: u64, trigger_price: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4().simple().to_string(),
            kind: OrderKind::StopLoss,
            symbol: symbol.into(),
            side: OrderSide::Sell,
            order_type: OrderType::StopLossMarket,
            quantity,
            price: None,
            trigger_price: Some(trigger_price),
        }
    }

    /// Limit sell at the profit target
    pub fn target(symbol: impl Into<String>, quantity: u64, price: Decimal) -> Self {
        Self {
            client_order_id: Uuid::new_v4().simple().to_string(),
            kind: OrderKind::Target,
            symbol: symbol.into(),
            side: OrderSide::Sell,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            trigger_price: None,
        }
    }
}

/// Broker-reported order state, normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BrokerOrderStatus {
    /// Accepted and working (open, trigger pending, validation pending, ...)
    Open,
    /// Fully executed
    Complete,
    Rejected,
    Cancelled,
}

impl BrokerOrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETE" => BrokerOrderStatus::Complete,
            "REJECTED" => BrokerOrderStatus::Rejected,
            "CANCELLED" | "CANCELED" => BrokerOrderStatus::Cancelled,
            _ => BrokerOrderStatus::Open,
        }
    }

    /// The order will never fill
    pub fn is_dead(&self) -> bool {
        matches!(self, BrokerOrderStatus::Rejected | BrokerOrderStatus::Cancelled)
    }
}

/// One status read of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub order_id: String,
    pub status: BrokerOrderStatus,
    pub average_price: Option<Decimal>,
    pub status_message: Option<String>,
}

impl OrderStatusReport {
    /// Average price of a completed order, if the broker reported one
    pub fn fill_price(&self) -> Option<Decimal> {
        match (self.status, self.average_price) {
            (BrokerOrderStatus::Complete, Some(price)) if price > Decimal::ZERO => Some(price),
            _ => None,
        }
    }
}
