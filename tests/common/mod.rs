#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use ipo_trader::broker::{BrokerClient, BrokerSessionProvider, FixedBrokerSession, NoBrokerSession};
use ipo_trader::config::AppConfig;
use ipo_trader::domain::{
    BrokerOrderStatus, Decision, DecisionUpdate, Ipo, IpoListing, NewDecision, OrderKind,
    OrderRequest, OrderStatusReport, PendingBuy, RunLog, RunOutcome, SubscriptionDetail,
    SubscriptionSnapshot,
};
use ipo_trader::error::{Result, TraderError};
use ipo_trader::market_data::MarketDataSource;
use ipo_trader::persistence::{
    DecisionLedger, IpoStore, MemoryStore, RunLogStore, SessionTokenStore, TraderStore,
};
use ipo_trader::strategy::DailyOrchestrator;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

pub fn multiples(qib: Decimal, snii: Decimal, bnii: Decimal, nii: Decimal, retail: Decimal) -> SubscriptionDetail {
    SubscriptionDetail { qib, nii, snii, bnii, retail }
}

/// Track an IPO closing on `close` and listing on `listing`
pub async fn seed_ipo(
    store: &MemoryStore,
    company: &str,
    symbol: Option<&str>,
    close: NaiveDate,
    listing: NaiveDate,
    issue_price: Option<Decimal>,
) {
    let mut ipo = Ipo::new(company);
    ipo.symbol = symbol.map(str::to_string);
    ipo.close_date = Some(close);
    ipo.listing_date = Some(listing);
    ipo.issue_price = issue_price;
    store.upsert_ipo(&ipo).await.unwrap();
}

pub async fn seed_snapshot(store: &MemoryStore, company: &str, close: NaiveDate, detail: SubscriptionDetail) {
    store
        .save_subscription(&SubscriptionSnapshot::new(company, close, detail))
        .await
        .unwrap();
}

/// Market-data source serving canned listings and details
#[derive(Default)]
pub struct FakeMarketData {
    pub listings: Vec<IpoListing>,
    pub details: HashMap<String, SubscriptionDetail>,
    pub failing_symbols: Vec<String>,
    pub list_unavailable: bool,
}

#[async_trait]
impl MarketDataSource for FakeMarketData {
    async fn fetch_current_ipo_list(&self) -> Result<Vec<IpoListing>> {
        if self.list_unavailable {
            return Err(TraderError::MarketDataUnavailable("exchange down".to_string()));
        }
        Ok(self.listings.clone())
    }

    async fn fetch_subscription_detail(&self, symbol: &str) -> Result<Option<SubscriptionDetail>> {
        if self.failing_symbols.iter().any(|s| s == symbol) {
            return Err(TraderError::InvalidMarketData(format!("bad payload for {}", symbol)));
        }
        Ok(self.details.get(symbol).copied())
    }
}

/// Broker that records every order and fills entries at a fixed price
#[derive(Default)]
pub struct FakeBroker {
    /// `None` leaves entries OPEN forever
    pub fill_price: Option<Decimal>,
    /// Reject orders of this kind
    pub reject_kind: Option<OrderKind>,
    /// Reject every order for this symbol
    pub reject_symbol: Option<String>,
    pub placed: Mutex<Vec<OrderRequest>>,
}

impl FakeBroker {
    pub fn filling_at(price: Decimal) -> Self {
        Self {
            fill_price: Some(price),
            ..Default::default()
        }
    }

    pub fn placed(&self) -> Vec<OrderRequest> {
        self.placed.lock().unwrap().clone()
    }

    pub fn entries(&self) -> usize {
        self.placed()
            .iter()
            .filter(|o| o.kind == OrderKind::Entry)
            .count()
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn has_valid_session(&self) -> bool {
        true
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<String> {
        if self.reject_kind == Some(request.kind)
            || self.reject_symbol.as_deref() == Some(request.symbol.as_str())
        {
            return Err(TraderError::OrderRejected(format!(
                "{} order for {} rejected",
                request.kind, request.symbol
            )));
        }

        let mut placed = self.placed.lock().unwrap();
        placed.push(request.clone());
        Ok(format!("{}-{}", request.kind, placed.len()))
    }

    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatusReport> {
        Ok(OrderStatusReport {
            order_id: order_id.to_string(),
            status: if self.fill_price.is_some() {
                BrokerOrderStatus::Complete
            } else {
                BrokerOrderStatus::Open
            },
            average_price: self.fill_price,
            status_message: None,
        })
    }
}

/// `MemoryStore` whose decision writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// How many upcoming `update_decision` calls fail
    pub failing_updates: AtomicUsize,
    /// `create_decision` always fails for this company
    pub reject_decisions_for: Option<String>,
}

impl FlakyStore {
    pub fn failing_updates(count: usize) -> Self {
        Self {
            failing_updates: AtomicUsize::new(count),
            ..Default::default()
        }
    }
}

#[async_trait]
impl IpoStore for FlakyStore {
    async fn upsert_ipo(&self, ipo: &Ipo) -> Result<()> {
        self.inner.upsert_ipo(ipo).await
    }

    async fn get_ipo(&self, company: &str) -> Result<Option<Ipo>> {
        self.inner.get_ipo(company).await
    }

    async fn list_closing_ipos(&self, close_date: NaiveDate) -> Result<Vec<Ipo>> {
        self.inner.list_closing_ipos(close_date).await
    }

    async fn ipos_for_date(&self, date: NaiveDate) -> Result<Vec<Ipo>> {
        self.inner.ipos_for_date(date).await
    }

    async fn save_subscription(&self, snapshot: &SubscriptionSnapshot) -> Result<bool> {
        self.inner.save_subscription(snapshot).await
    }

    async fn get_subscription(
        &self,
        company: &str,
        close_date: NaiveDate,
    ) -> Result<Option<SubscriptionSnapshot>> {
        self.inner.get_subscription(company, close_date).await
    }
}

#[async_trait]
impl DecisionLedger for FlakyStore {
    async fn create_decision(&self, decision: &NewDecision) -> Result<i64> {
        if self.reject_decisions_for.as_deref() == Some(decision.company.as_str()) {
            return Err(TraderError::Internal("deadlock detected".to_string()));
        }
        self.inner.create_decision(decision).await
    }

    async fn update_decision(&self, id: i64, update: &DecisionUpdate) -> Result<()> {
        let fail = self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(TraderError::Internal("connection reset".to_string()));
        }
        self.inner.update_decision(id, update).await
    }

    async fn get_decision(&self, id: i64) -> Result<Option<Decision>> {
        self.inner.get_decision(id).await
    }

    async fn list_pending_buys(&self, listing_date: NaiveDate) -> Result<Vec<PendingBuy>> {
        self.inner.list_pending_buys(listing_date).await
    }

    async fn decisions_for_date(&self, date: NaiveDate) -> Result<Vec<Decision>> {
        self.inner.decisions_for_date(date).await
    }
}

#[async_trait]
impl RunLogStore for FlakyStore {
    async fn log_run(&self, outcome: &RunOutcome) -> Result<i64> {
        self.inner.log_run(outcome).await
    }

    async fn logs_for_date(&self, run_date: NaiveDate) -> Result<Vec<RunLog>> {
        self.inner.logs_for_date(run_date).await
    }
}

#[async_trait]
impl SessionTokenStore for FlakyStore {
    async fn save_access_token(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.inner.save_access_token(token, expires_at).await
    }

    async fn valid_access_token(&self, now: DateTime<Utc>) -> Result<Option<String>> {
        self.inner.valid_access_token(now).await
    }
}

pub fn fast_config() -> AppConfig {
    let mut config = AppConfig::default_config();
    config.execution.fill_wait_ms = 50;
    config.execution.poll_interval_ms = 5;
    config
}

pub fn orchestrator<S: TraderStore + 'static>(
    store: Arc<S>,
    market_data: FakeMarketData,
    broker: Option<Arc<FakeBroker>>,
) -> DailyOrchestrator {
    let sessions: Arc<dyn BrokerSessionProvider> = match broker {
        Some(broker) => Arc::new(FixedBrokerSession(broker)),
        None => Arc::new(NoBrokerSession),
    };
    DailyOrchestrator::new(store, Arc::new(market_data), sessions, &fast_config())
}
