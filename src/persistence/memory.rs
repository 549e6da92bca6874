//! In-memory store with the same contracts as the Postgres store.
//!
//! Used by `--memory` runs and by tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::traits::{DecisionLedger, IpoStore, RunLogStore, SessionTokenStore};
use crate::domain::{
    Decision, DecisionStatus, DecisionUpdate, Ipo, NewDecision, PendingBuy, RunLog, RunOutcome,
    SubscriptionSnapshot, Verdict,
};
use crate::error::{Result, TraderError};

#[derive(Default)]
struct Inner {
    ipos: BTreeMap<String, Ipo>,
    subscriptions: BTreeMap<(String, NaiveDate), SubscriptionSnapshot>,
    decisions: BTreeMap<i64, Decision>,
    run_logs: Vec<RunLog>,
    tokens: Vec<(String, DateTime<Utc>)>,
    next_decision_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IpoStore for MemoryStore {
    async fn upsert_ipo(&self, ipo: &Ipo) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .ipos
            .entry(ipo.company.clone())
            .and_modify(|stored| stored.merge(ipo))
            .or_insert_with(|| ipo.clone());
        Ok(())
    }

    async fn get_ipo(&self, company: &str) -> Result<Option<Ipo>> {
        Ok(self.inner.read().await.ipos.get(company).cloned())
    }

    async fn list_closing_ipos(&self, close_date: NaiveDate) -> Result<Vec<Ipo>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ipos
            .values()
            .filter(|ipo| ipo.close_date == Some(close_date))
            .cloned()
            .collect())
    }

    async fn ipos_for_date(&self, date: NaiveDate) -> Result<Vec<Ipo>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ipos
            .values()
            .filter(|ipo| {
                ipo.open_date == Some(date)
                    || ipo.close_date == Some(date)
                    || ipo.listing_date == Some(date)
            })
            .cloned()
            .collect())
    }

    async fn save_subscription(&self, snapshot: &SubscriptionSnapshot) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let key = (snapshot.company.clone(), snapshot.close_date);
        if inner.subscriptions.contains_key(&key) {
            return Ok(false);
        }
        inner.subscriptions.insert(key, snapshot.clone());
        Ok(true)
    }

    async fn get_subscription(
        &self,
        company: &str,
        close_date: NaiveDate,
    ) -> Result<Option<SubscriptionSnapshot>> {
        let inner = self.inner.read().await;
        Ok(inner
            .subscriptions
            .get(&(company.to_string(), close_date))
            .cloned())
    }
}

#[async_trait]
impl DecisionLedger for MemoryStore {
    async fn create_decision(&self, decision: &NewDecision) -> Result<i64> {
        let mut inner = self.inner.write().await;
        if inner
            .decisions
            .values()
            .any(|d| d.date == decision.date && d.company == decision.company)
        {
            return Err(TraderError::Validation(format!(
                "decision for {} on {} already exists",
                decision.company, decision.date
            )));
        }
        inner.next_decision_id += 1;
        let id = inner.next_decision_id;
        let now = Utc::now();

        inner.decisions.insert(
            id,
            Decision {
                id,
                date: decision.date,
                company: decision.company.clone(),
                verdict: decision.verdict,
                justification: decision.justification.clone(),
                status: decision.verdict.initial_status(),
                order_id: None,
                stop_loss_order_id: None,
                target_order_id: None,
                entry_price: None,
                stop_loss_price: None,
                target_price: None,
                quantity: None,
                note: None,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_decision(&self, id: i64, update: &DecisionUpdate) -> Result<()> {
        let mut inner = self.inner.write().await;
        let decision = inner
            .decisions
            .get_mut(&id)
            .ok_or_else(|| TraderError::NotFound(format!("decision {}", id)))?;

        if !decision.status.can_transition_to(update.status) {
            return Err(TraderError::InvalidStateTransition {
                from: decision.status.to_string(),
                to: update.status.to_string(),
            });
        }

        update.apply_to(decision);
        Ok(())
    }

    async fn get_decision(&self, id: i64) -> Result<Option<Decision>> {
        Ok(self.inner.read().await.decisions.get(&id).cloned())
    }

    async fn list_pending_buys(&self, listing_date: NaiveDate) -> Result<Vec<PendingBuy>> {
        let inner = self.inner.read().await;
        Ok(inner
            .decisions
            .values()
            .filter(|d| d.verdict == Verdict::Buy && d.status == DecisionStatus::Pending)
            .filter_map(|d| {
                let ipo = inner.ipos.get(&d.company)?;
                (ipo.listing_date == Some(listing_date)).then(|| PendingBuy {
                    decision: d.clone(),
                    issue_price: ipo.issue_price,
                    symbol: ipo.symbol.clone(),
                })
            })
            .collect())
    }

    async fn decisions_for_date(&self, date: NaiveDate) -> Result<Vec<Decision>> {
        let inner = self.inner.read().await;
        Ok(inner
            .decisions
            .values()
            .rev()
            .filter(|d| d.date == date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RunLogStore for MemoryStore {
    async fn log_run(&self, outcome: &RunOutcome) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let id = inner.run_logs.len() as i64 + 1;
        inner.run_logs.push(RunLog {
            id,
            run_date: outcome.run_date,
            kind: outcome.kind,
            status: outcome.status,
            details: outcome.details.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn logs_for_date(&self, run_date: NaiveDate) -> Result<Vec<RunLog>> {
        let inner = self.inner.read().await;
        Ok(inner
            .run_logs
            .iter()
            .filter(|log| log.run_date == run_date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SessionTokenStore for MemoryStore {
    async fn save_access_token(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.inner
            .write()
            .await
            .tokens
            .push((token.to_string(), expires_at));
        Ok(())
    }

    async fn valid_access_token(&self, now: DateTime<Utc>) -> Result<Option<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tokens
            .iter()
            .rev()
            .find(|(_, expires_at)| *expires_at > now)
            .map(|(token, _)| token.clone()))
    }
}
