use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    Decision, DecisionUpdate, Ipo, NewDecision, PendingBuy, RunLog, RunOutcome,
    SubscriptionSnapshot,
};
use crate::error::Result;

/// IPO and subscription records written by the scrape pass
#[async_trait]
pub trait IpoStore: Send + Sync {
    /// Insert or refresh by company; known fields are never cleared
    async fn upsert_ipo(&self, ipo: &Ipo) -> Result<()>;

    async fn get_ipo(&self, company: &str) -> Result<Option<Ipo>>;

    async fn list_closing_ipos(&self, close_date: NaiveDate) -> Result<Vec<Ipo>>;

    /// IPOs opening, closing or listing on `date`
    async fn ipos_for_date(&self, date: NaiveDate) -> Result<Vec<Ipo>>;

    /// Store a snapshot unless one already exists for (company, close_date).
    ///
    /// Returns `true` when the snapshot was inserted.
    async fn save_subscription(&self, snapshot: &SubscriptionSnapshot) -> Result<bool>;

    async fn get_subscription(
        &self,
        company: &str,
        close_date: NaiveDate,
    ) -> Result<Option<SubscriptionSnapshot>>;
}

/// Single writer of decision status
#[async_trait]
pub trait DecisionLedger: Send + Sync {
    /// Record a verdict; BUY starts `PENDING`, SKIP starts `SKIPPED`
    async fn create_decision(&self, decision: &NewDecision) -> Result<i64>;

    /// Apply a terminal update to a `PENDING` decision.
    ///
    /// Fails with `InvalidStateTransition` (and writes nothing) if the
    /// decision has already left `PENDING`.
    async fn update_decision(&self, id: i64, update: &DecisionUpdate) -> Result<()>;

    async fn get_decision(&self, id: i64) -> Result<Option<Decision>>;

    /// BUY decisions still `PENDING` whose IPO lists on `listing_date`
    async fn list_pending_buys(&self, listing_date: NaiveDate) -> Result<Vec<PendingBuy>>;

    async fn decisions_for_date(&self, date: NaiveDate) -> Result<Vec<Decision>>;
}

/// Append-only run log
#[async_trait]
pub trait RunLogStore: Send + Sync {
    async fn log_run(&self, outcome: &RunOutcome) -> Result<i64>;

    async fn logs_for_date(&self, run_date: NaiveDate) -> Result<Vec<RunLog>>;
}

/// Broker access tokens obtained out of band
#[async_trait]
pub trait SessionTokenStore: Send + Sync {
    async fn save_access_token(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Latest token that has not expired at `now`
    async fn valid_access_token(&self, now: DateTime<Utc>) -> Result<Option<String>>;
}

/// Everything the orchestrator needs from storage
pub trait TraderStore: IpoStore + DecisionLedger + RunLogStore + SessionTokenStore {}

impl<T> TraderStore for T where T: IpoStore + DecisionLedger + RunLogStore + SessionTokenStore {}
