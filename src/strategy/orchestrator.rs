//! Daily Orchestrator
//!
//! Composes the evaluation pass (IPOs closing on a date), the trading pass
//! (IPOs listing on a date) and the scrape pass. Each pass is safe to re-run
//! and ends with one run-log row. Failures are isolated per company.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::executor::{TradeExecutor, TradeOutcome, UnrecordedTrade};
use super::rules::{self, NO_SUBSCRIPTION_DATA};
use crate::broker::{BrokerSessionProvider, SymbolResolver};
use crate::config::AppConfig;
use crate::domain::{DecisionStatus, Ipo, NewDecision, RunKind, RunOutcome, Verdict};
use crate::error::{Result, TraderError};
use crate::market_data::{MarketDataSource, Scraper};
use crate::persistence::{DecisionLedger, IpoStore, RunLogStore, TraderStore};

/// Per-outcome counts for one trading pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TradeTally {
    pub executed: usize,
    pub simulated: usize,
    pub failed: usize,
    pub already_final: usize,
    pub errors: usize,
}

impl TradeTally {
    fn record(&mut self, outcome: &TradeOutcome) {
        match outcome {
            TradeOutcome::AlreadyFinal(_) => self.already_final += 1,
            TradeOutcome::Finalized { update, .. } => match update.status {
                DecisionStatus::Executed => self.executed += 1,
                DecisionStatus::Simulated => self.simulated += 1,
                _ => self.failed += 1,
            },
        }
    }

    fn processed(&self) -> usize {
        self.executed + self.simulated + self.failed + self.already_final + self.errors
    }
}

pub struct DailyOrchestrator {
    store: Arc<dyn TraderStore>,
    scraper: Scraper,
    sessions: Arc<dyn BrokerSessionProvider>,
    executor: TradeExecutor,
}

impl DailyOrchestrator {
    pub fn new<S>(
        store: Arc<S>,
        market_data: Arc<dyn MarketDataSource>,
        sessions: Arc<dyn BrokerSessionProvider>,
        config: &AppConfig,
    ) -> Self
    where
        S: TraderStore + 'static,
    {
        let executor = TradeExecutor::new(
            store.clone(),
            config.trading.clone(),
            config.execution.clone(),
            SymbolResolver::new(config.symbols.clone()),
        );

        Self {
            scraper: Scraper::new(market_data, store.clone()),
            store,
            sessions,
            executor,
        }
    }

    /// Record a BUY/SKIP decision for every IPO closing on `date`
    #[instrument(skip(self))]
    pub async fn run_evaluation(&self, date: NaiveDate) -> RunOutcome {
        let outcome = match self.evaluate_closing(date).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Evaluation pass failed: {}", e);
                RunOutcome::failed(date, RunKind::Evaluate, e.to_string())
            }
        };
        self.record(outcome).await
    }

    async fn evaluate_closing(&self, date: NaiveDate) -> Result<RunOutcome> {
        let closing = self.store.list_closing_ipos(date).await?;
        let decided: HashSet<String> = self
            .store
            .decisions_for_date(date)
            .await?
            .into_iter()
            .map(|d| d.company)
            .collect();

        let (mut evaluated, mut already_decided, mut errors) = (0usize, 0usize, 0usize);
        let (mut buys, mut skips) = (0usize, 0usize);

        for ipo in &closing {
            if decided.contains(&ipo.company) {
                already_decided += 1;
                continue;
            }

            match self.evaluate_one(date, ipo).await {
                Ok(Verdict::Buy) => {
                    evaluated += 1;
                    buys += 1;
                }
                Ok(Verdict::Skip) => {
                    evaluated += 1;
                    skips += 1;
                }
                Err(e) => {
                    errors += 1;
                    error!(company = %ipo.company, "Evaluation failed: {}", e);
                }
            }
        }

        info!(evaluated, buys, skips, already_decided, errors, "Evaluation pass complete");

        let mut details = format!("Evaluated {} IPOs", evaluated);
        if already_decided > 0 {
            details.push_str(&format!(", {} already decided", already_decided));
        }
        if errors > 0 {
            details.push_str(&format!(", {} failed", errors));
            return Ok(RunOutcome::failed(date, RunKind::Evaluate, details));
        }
        Ok(RunOutcome::success(date, RunKind::Evaluate, details))
    }

    async fn evaluate_one(&self, date: NaiveDate, ipo: &Ipo) -> Result<Verdict> {
        let snapshot = self.store.get_subscription(&ipo.company, date).await?;

        let (verdict, justification) = match snapshot {
            Some(snapshot) => {
                let evaluation = rules::evaluate(&snapshot);
                (evaluation.verdict, evaluation.justification)
            }
            None => (Verdict::Skip, NO_SUBSCRIPTION_DATA.to_string()),
        };

        let id = self
            .store
            .create_decision(&NewDecision::new(date, &ipo.company, verdict, &justification))
            .await?;

        info!(decision_id = id, company = %ipo.company, %verdict, %justification, "Decision recorded");
        Ok(verdict)
    }

    /// Execute every pending BUY for IPOs listing on `date`
    #[instrument(skip(self))]
    pub async fn run_trading(&self, date: NaiveDate) -> RunOutcome {
        let pending = match self.store.list_pending_buys(date).await {
            Ok(pending) => pending,
            Err(e) => {
                error!("Trading pass failed: {}", e);
                return self
                    .record(RunOutcome::failed(date, RunKind::Trade, e.to_string()))
                    .await;
            }
        };

        // No pending buys means no reason to touch the broker
        let broker = if pending.is_empty() {
            None
        } else {
            self.sessions.acquire().await
        };
        if broker.is_none() && !pending.is_empty() {
            warn!(count = pending.len(), "No broker session, trades will be simulated");
        }

        let mut tally = TradeTally::default();
        for buy in &pending {
            match self.executor.execute(buy, broker.as_deref()).await {
                Ok(outcome) => tally.record(&outcome),
                Err(unrecorded) => {
                    error!(company = %buy.decision.company, "Trade execution failed: {}", unrecorded);
                    match self.recover(unrecorded).await {
                        Some(outcome) => tally.record(&outcome),
                        None => tally.errors += 1,
                    }
                }
            }
        }

        info!(
            executed = tally.executed,
            simulated = tally.simulated,
            failed = tally.failed,
            errors = tally.errors,
            "Trading pass complete"
        );

        let mut details = format!(
            "Processed {} trades: {} executed, {} simulated, {} failed",
            tally.processed(),
            tally.executed,
            tally.simulated,
            tally.failed
        );
        if tally.already_final > 0 {
            details.push_str(&format!(", {} already final", tally.already_final));
        }
        let outcome = if tally.errors > 0 {
            details.push_str(&format!(", {} errors", tally.errors));
            RunOutcome::failed(date, RunKind::Trade, details)
        } else {
            RunOutcome::success(date, RunKind::Trade, details)
        };
        self.record(outcome).await
    }

    /// Retry the write the executor could not make. If that fails too, close
    /// the decision as FAILED with whatever order ids it obtained so a rerun
    /// never submits a second entry.
    async fn recover(&self, unrecorded: UnrecordedTrade) -> Option<TradeOutcome> {
        let UnrecordedTrade {
            decision_id,
            update,
            fill,
            source,
        } = unrecorded;

        match self.store.update_decision(decision_id, &update).await {
            Ok(()) => {
                info!(decision_id, status = %update.status, "Trade outcome recorded on retry");
                return Some(TradeOutcome::Finalized { update, fill });
            }
            // The first write landed after all
            Err(TraderError::InvalidStateTransition { .. }) => return None,
            Err(e) => warn!(decision_id, "Retrying trade outcome failed: {}", e),
        }

        let fallback = update.into_failed(format!("execution error: {}", source));
        match self.store.update_decision(decision_id, &fallback).await {
            Ok(()) | Err(TraderError::InvalidStateTransition { .. }) => {}
            Err(e) => error!(
                decision_id,
                order_id = ?fallback.order_id,
                stop_loss_order_id = ?fallback.stop_loss_order_id,
                target_order_id = ?fallback.target_order_id,
                "Could not mark decision failed: {}",
                e
            ),
        }
        None
    }

    /// Refresh IPOs and subscription snapshots; returns the two run outcomes
    #[instrument(skip(self))]
    pub async fn run_scrape(&self, date: NaiveDate) -> (RunOutcome, RunOutcome) {
        let (ipos, subs) = self.scraper.run(date).await;
        (self.record(ipos).await, self.record(subs).await)
    }

    /// Scrape, evaluate, then trade for `date`
    #[instrument(skip(self))]
    pub async fn run_daily(&self, date: NaiveDate) -> RunOutcome {
        info!("Running daily job");

        let (ipos, subs) = self.run_scrape(date).await;
        let evaluation = self.run_evaluation(date).await;
        let trading = self.run_trading(date).await;

        let failed: Vec<&str> = [&ipos, &subs, &evaluation, &trading]
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.kind.as_str())
            .collect();

        let outcome = if failed.is_empty() {
            RunOutcome::success(date, RunKind::DailyJob, format!("Completed for {}", date))
        } else {
            RunOutcome::failed(
                date,
                RunKind::DailyJob,
                format!("Completed for {} with failed passes: {}", date, failed.join(", ")),
            )
        };
        self.record(outcome).await
    }

    async fn record(&self, outcome: RunOutcome) -> RunOutcome {
        if let Err(e) = self.store.log_run(&outcome).await {
            warn!(kind = %outcome.kind, "Failed to write run log: {}", e);
        }
        outcome
    }
}
