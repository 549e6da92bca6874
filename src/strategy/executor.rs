//! Listing-day trade sequencer.
//!
//! For one pending BUY: size the position, place a single market entry, wait a
//! bounded time for the fill, then place stop-loss and target sells around
//! the fill price and finalize the decision. The entry is never retried. A
//! missing fill price falls back to the issue price, and a failed bracket leg
//! never undoes the entry: an open position always gets protection orders,
//! even approximate ones.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use super::sizing::{bracket_prices, quantity, BracketPrices};
use crate::broker::{BrokerClient, SymbolResolver};
use crate::config::{ExecutionConfig, TradingConfig};
use crate::domain::{
    DecisionStatus, DecisionUpdate, OrderKind, OrderRequest, OrderStatusReport, PendingBuy,
};
use crate::error::TraderError;
use crate::persistence::DecisionLedger;

/// How the entry price was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillQuality {
    /// Broker reported the order complete with an average price
    Confirmed,
    /// No fill within the wait window; issue price used instead
    Approximate,
}

/// Result of resolving the entry fill
#[derive(Debug, Clone, PartialEq)]
enum FillResolution {
    Filled { price: Decimal, quality: FillQuality },
    /// Broker rejected or cancelled the entry after accepting it
    Dead(OrderStatusReport),
}

/// What happened to one pending decision
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// Decision had already left PENDING; nothing was sent or written
    AlreadyFinal(DecisionStatus),
    /// Decision moved to a terminal state
    Finalized {
        update: DecisionUpdate,
        fill: Option<FillQuality>,
    },
}

impl TradeOutcome {
    pub fn status(&self) -> DecisionStatus {
        match self {
            TradeOutcome::AlreadyFinal(status) => *status,
            TradeOutcome::Finalized { update, .. } => update.status,
        }
    }
}

/// The sequence ran but its terminal write failed.
///
/// Carries the update that was meant to be written so the caller can retry
/// it; orders named in it may already be live at the broker.
#[derive(Error, Debug)]
#[error("outcome of decision {decision_id} not recorded: {source}")]
pub struct UnrecordedTrade {
    pub decision_id: i64,
    pub update: DecisionUpdate,
    pub fill: Option<FillQuality>,
    pub source: TraderError,
}

pub type ExecutionResult = std::result::Result<TradeOutcome, UnrecordedTrade>;

/// Drives a pending BUY decision to `EXECUTED`, `SIMULATED` or `FAILED`
pub struct TradeExecutor {
    ledger: Arc<dyn DecisionLedger>,
    trading: TradingConfig,
    execution: ExecutionConfig,
    symbols: SymbolResolver,
}

impl TradeExecutor {
    pub fn new(
        ledger: Arc<dyn DecisionLedger>,
        trading: TradingConfig,
        execution: ExecutionConfig,
        symbols: SymbolResolver,
    ) -> Self {
        Self {
            ledger,
            trading,
            execution,
            symbols,
        }
    }

    /// Run the full sequence for one decision.
    ///
    /// `broker` is `None` when no session could be acquired; the decision is
    /// then simulated. Returns `Err` only when the final ledger write fails.
    #[instrument(skip_all, fields(decision_id = pending.decision.id, company = %pending.decision.company))]
    pub async fn execute(
        &self,
        pending: &PendingBuy,
        broker: Option<&dyn BrokerClient>,
    ) -> ExecutionResult {
        let decision = &pending.decision;

        if decision.status != DecisionStatus::Pending {
            debug!(status = %decision.status, "Decision already final, skipping");
            return Ok(TradeOutcome::AlreadyFinal(decision.status));
        }

        let Some(broker) = broker else {
            info!("No broker session, simulating trade");
            return self.finalize(decision.id, DecisionUpdate::simulated(), None).await;
        };

        let qty = quantity(self.trading.investment_amount, pending.issue_price);
        let issue_price = match pending.issue_price {
            Some(price) if qty > 0 => price,
            _ => {
                warn!(issue_price = ?pending.issue_price, "Cannot size position");
                let update = DecisionUpdate::failed(format!(
                    "invalid quantity: issue price {}",
                    pending
                        .issue_price
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                ));
                return self.finalize(decision.id, update, None).await;
            }
        };

        let Some(symbol) = self
            .symbols
            .resolve(&decision.company, pending.symbol.as_deref())
        else {
            warn!("No trading symbol for company");
            let update = DecisionUpdate::failed("no trading symbol for company");
            return self.finalize(decision.id, update, None).await;
        };

        // Exactly one entry attempt; a duplicate entry is worse than a missed trade
        let entry = OrderRequest::entry(&symbol, qty);
        let entry_id = match broker.place_order(&entry).await {
            Ok(order_id) => order_id,
            Err(e) => {
                error!(%symbol, qty, "Entry order rejected: {}", e);
                let update = DecisionUpdate::failed(format!("entry order rejected: {}", e));
                return self.finalize(decision.id, update, None).await;
            }
        };
        info!(%symbol, qty, order_id = %entry_id, "Entry order placed");

        let (fill_price, quality) = match self.resolve_fill(broker, &entry_id, issue_price).await {
            FillResolution::Filled { price, quality } => (price, quality),
            FillResolution::Dead(report) => {
                error!(order_id = %entry_id, status = ?report.status, "Entry order did not fill");
                let mut update = DecisionUpdate::failed(format!(
                    "entry order {:?}: {}",
                    report.status,
                    report.status_message.unwrap_or_default()
                ))
                .with_order_id(&entry_id);
                update.quantity = Some(qty);
                return self.finalize(decision.id, update, None).await;
            }
        };

        let BracketPrices { stop_loss, target } = bracket_prices(
            fill_price,
            self.trading.stop_loss_percent,
            self.trading.target_profit_percent,
        );

        let mut notes = Vec::new();
        if quality == FillQuality::Approximate {
            notes.push(format!("approximate fill: issue price {} used", issue_price));
        }

        let stop_loss_id = self
            .place_bracket_leg(broker, OrderRequest::stop_loss(&symbol, qty, stop_loss), &mut notes)
            .await;
        let target_id = self
            .place_bracket_leg(broker, OrderRequest::target(&symbol, qty, target), &mut notes)
            .await;

        let update = DecisionUpdate {
            status: DecisionStatus::Executed,
            order_id: Some(entry_id.clone()),
            stop_loss_order_id: stop_loss_id,
            target_order_id: target_id,
            entry_price: Some(fill_price),
            stop_loss_price: Some(stop_loss),
            target_price: Some(target),
            quantity: Some(qty),
            note: (!notes.is_empty()).then(|| notes.join("; ")),
        };

        info!(
            %symbol,
            qty,
            entry = %fill_price,
            stop_loss = %stop_loss,
            target = %target,
            "Trade executed"
        );

        self.finalize(decision.id, update, Some(quality)).await
    }

    /// Poll the entry order until it completes, dies, or the window closes
    async fn resolve_fill(
        &self,
        broker: &dyn BrokerClient,
        order_id: &str,
        issue_price: Decimal,
    ) -> FillResolution {
        let wait = Duration::from_millis(self.execution.fill_wait_ms);
        let poll_interval = Duration::from_millis(self.execution.poll_interval_ms.max(1));

        let poll = async {
            loop {
                match broker.get_order_status(order_id).await {
                    Ok(report) => {
                        if let Some(price) = report.fill_price() {
                            return FillResolution::Filled {
                                price,
                                quality: FillQuality::Confirmed,
                            };
                        }
                        if report.status.is_dead() {
                            return FillResolution::Dead(report);
                        }
                        debug!(status = ?report.status, "Entry not filled yet");
                    }
                    Err(e) => warn!(%order_id, "Order status lookup failed: {}", e),
                }
                sleep(poll_interval).await;
            }
        };

        match timeout(wait, poll).await {
            Ok(resolution) => resolution,
            Err(_) => {
                warn!(
                    marker = "approximate_fill",
                    %order_id,
                    %issue_price,
                    "Fill not confirmed within {}ms, using issue price",
                    self.execution.fill_wait_ms
                );
                FillResolution::Filled {
                    price: issue_price,
                    quality: FillQuality::Approximate,
                }
            }
        }
    }

    /// Place one protective leg; failure is logged and noted, never fatal
    async fn place_bracket_leg(
        &self,
        broker: &dyn BrokerClient,
        request: OrderRequest,
        notes: &mut Vec<String>,
    ) -> Option<String> {
        let kind = request.kind;
        match broker.place_order(&request).await {
            Ok(order_id) => {
                info!(%kind, %order_id, "Bracket order placed");
                Some(order_id)
            }
            Err(e) => {
                error!(%kind, symbol = %request.symbol, "Bracket order failed: {}", e);
                let leg = match kind {
                    OrderKind::StopLoss => "stop-loss",
                    OrderKind::Target => "target",
                    OrderKind::Entry => "entry",
                };
                notes.push(format!("{} order failed: {}", leg, e));
                None
            }
        }
    }

    async fn finalize(
        &self,
        decision_id: i64,
        update: DecisionUpdate,
        fill: Option<FillQuality>,
    ) -> ExecutionResult {
        if let Err(e) = self.ledger.update_decision(decision_id, &update).await {
            error!(
                decision_id,
                status = %update.status,
                order_id = ?update.order_id,
                stop_loss_order_id = ?update.stop_loss_order_id,
                target_order_id = ?update.target_order_id,
                "Failed to record trade outcome: {}",
                e
            );
            return Err(UnrecordedTrade {
                decision_id,
                update,
                fill,
                source: e,
            });
        }

        Ok(TradeOutcome::Finalized { update, fill })
    }
}
