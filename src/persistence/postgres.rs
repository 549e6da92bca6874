use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info, instrument};

use super::traits::{DecisionLedger, IpoStore, RunLogStore, SessionTokenStore};
use crate::domain::{
    Decision, DecisionStatus, DecisionUpdate, Ipo, NewDecision, PendingBuy, RunKind, RunLog,
    RunOutcome, RunStatus, SubscriptionDetail, SubscriptionSnapshot, Verdict,
};
use crate::error::{Result, TraderError};

const DECISION_COLUMNS: &str = r#"
    d.id, d.date, d.company, d.decision_type, d.reason, d.status,
    d.order_id, d.stop_loss_order_id, d.target_order_id,
    d.entry_price, d.stop_loss_price, d.target_price, d.quantity, d.note,
    d.created_at, d.updated_at
"#;

/// PostgreSQL storage adapter
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a PostgreSQL store from an existing connection pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn ipo_from_row(row: &PgRow) -> Ipo {
        Ipo {
            company: row.get("company"),
            symbol: row.get("symbol"),
            open_date: row.get("open_date"),
            close_date: row.get("close_date"),
            listing_date: row.get("listing_date"),
            issue_price: row.get("issue_price"),
        }
    }

    fn snapshot_from_row(row: &PgRow) -> SubscriptionSnapshot {
        SubscriptionSnapshot {
            company: row.get("company"),
            close_date: row.get("close_date"),
            multiples: SubscriptionDetail::from_optional(
                row.get("qib"),
                row.get("nii"),
                row.get("snii"),
                row.get("bnii"),
                row.get("retail"),
            ),
        }
    }

    fn decision_from_row(row: &PgRow) -> Result<Decision> {
        let verdict: String = row.get("decision_type");
        let status: String = row.get("status");
        let quantity: Option<i64> = row.get("quantity");

        Ok(Decision {
            id: row.get("id"),
            date: row.get("date"),
            company: row.get("company"),
            verdict: Verdict::try_from(verdict.as_str()).map_err(TraderError::Internal)?,
            justification: row.get("reason"),
            status: DecisionStatus::try_from(status.as_str()).map_err(TraderError::Internal)?,
            order_id: row.get("order_id"),
            stop_loss_order_id: row.get("stop_loss_order_id"),
            target_order_id: row.get("target_order_id"),
            entry_price: row.get("entry_price"),
            stop_loss_price: row.get("stop_loss_price"),
            target_price: row.get("target_price"),
            quantity: quantity.map(|q| q.max(0) as u64),
            note: row.get("note"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    fn run_log_from_row(row: &PgRow) -> Result<RunLog> {
        let kind: String = row.get("run_type");
        let status: String = row.get("status");

        Ok(RunLog {
            id: row.get("id"),
            run_date: row.get("run_date"),
            kind: RunKind::try_from(kind.as_str()).map_err(TraderError::Internal)?,
            status: RunStatus::try_from(status.as_str()).map_err(TraderError::Internal)?,
            details: row.get("details"),
            created_at: row.get("created_at"),
        })
    }
}

// ==================== IPOs & subscriptions ====================

#[async_trait]
impl IpoStore for PostgresStore {
    #[instrument(skip(self, ipo), fields(company = %ipo.company))]
    async fn upsert_ipo(&self, ipo: &Ipo) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ipos (company, symbol, open_date, close_date, listing_date, issue_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (company) DO UPDATE SET
                symbol = COALESCE(EXCLUDED.symbol, ipos.symbol),
                open_date = COALESCE(EXCLUDED.open_date, ipos.open_date),
                close_date = COALESCE(EXCLUDED.close_date, ipos.close_date),
                listing_date = COALESCE(EXCLUDED.listing_date, ipos.listing_date),
                issue_price = COALESCE(EXCLUDED.issue_price, ipos.issue_price),
                scraped_at = NOW()
            "#,
        )
        .bind(&ipo.company)
        .bind(&ipo.symbol)
        .bind(ipo.open_date)
        .bind(ipo.close_date)
        .bind(ipo.listing_date)
        .bind(ipo.issue_price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_ipo(&self, company: &str) -> Result<Option<Ipo>> {
        let row = sqlx::query(
            r#"
            SELECT company, symbol, open_date, close_date, listing_date, issue_price
            FROM ipos WHERE company = $1
            "#,
        )
        .bind(company)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::ipo_from_row))
    }

    async fn list_closing_ipos(&self, close_date: NaiveDate) -> Result<Vec<Ipo>> {
        let rows = sqlx::query(
            r#"
            SELECT company, symbol, open_date, close_date, listing_date, issue_price
            FROM ipos WHERE close_date = $1
            ORDER BY company
            "#,
        )
        .bind(close_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::ipo_from_row).collect())
    }

    async fn ipos_for_date(&self, date: NaiveDate) -> Result<Vec<Ipo>> {
        let rows = sqlx::query(
            r#"
            SELECT company, symbol, open_date, close_date, listing_date, issue_price
            FROM ipos
            WHERE close_date = $1 OR listing_date = $1 OR open_date = $1
            ORDER BY company
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::ipo_from_row).collect())
    }

    #[instrument(skip(self, snapshot), fields(company = %snapshot.company))]
    async fn save_subscription(&self, snapshot: &SubscriptionSnapshot) -> Result<bool> {
        let m = &snapshot.multiples;
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (company, close_date, qib, snii, bnii, nii, retail)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (company, close_date) DO NOTHING
            "#,
        )
        .bind(&snapshot.company)
        .bind(snapshot.close_date)
        .bind(m.qib)
        .bind(m.snii)
        .bind(m.bnii)
        .bind(m.nii)
        .bind(m.retail)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if !inserted {
            debug!("Subscription snapshot already stored, keeping first");
        }
        Ok(inserted)
    }

    async fn get_subscription(
        &self,
        company: &str,
        close_date: NaiveDate,
    ) -> Result<Option<SubscriptionSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT company, close_date, qib, snii, bnii, nii, retail
            FROM subscriptions
            WHERE company = $1 AND close_date = $2
            "#,
        )
        .bind(company)
        .bind(close_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::snapshot_from_row))
    }
}

// ==================== Decisions ====================

#[async_trait]
impl DecisionLedger for PostgresStore {
    #[instrument(skip(self, decision), fields(company = %decision.company, verdict = %decision.verdict))]
    async fn create_decision(&self, decision: &NewDecision) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO decisions (date, company, decision_type, reason, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(decision.date)
        .bind(&decision.company)
        .bind(decision.verdict.as_str())
        .bind(&decision.justification)
        .bind(decision.verdict.initial_status().as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    #[instrument(skip(self, update), fields(status = %update.status))]
    async fn update_decision(&self, id: i64, update: &DecisionUpdate) -> Result<()> {
        if !DecisionStatus::Pending.can_transition_to(update.status) {
            return Err(TraderError::InvalidStateTransition {
                from: DecisionStatus::Pending.to_string(),
                to: update.status.to_string(),
            });
        }

        // Guarded on PENDING so a decision is finalized at most once
        let result = sqlx::query(
            r#"
            UPDATE decisions SET
                status = $2,
                order_id = COALESCE($3, order_id),
                stop_loss_order_id = COALESCE($4, stop_loss_order_id),
                target_order_id = COALESCE($5, target_order_id),
                entry_price = COALESCE($6, entry_price),
                stop_loss_price = COALESCE($7, stop_loss_price),
                target_price = COALESCE($8, target_price),
                quantity = COALESCE($9, quantity),
                note = COALESCE($10, note),
                updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(&update.order_id)
        .bind(&update.stop_loss_order_id)
        .bind(&update.target_order_id)
        .bind(update.entry_price)
        .bind(update.stop_loss_price)
        .bind(update.target_price)
        .bind(update.quantity.map(|q| q as i64))
        .bind(&update.note)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        match self.get_decision(id).await? {
            Some(current) => Err(TraderError::InvalidStateTransition {
                from: current.status.to_string(),
                to: update.status.to_string(),
            }),
            None => Err(TraderError::NotFound(format!("decision {}", id))),
        }
    }

    async fn get_decision(&self, id: i64) -> Result<Option<Decision>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM decisions d WHERE d.id = $1",
            DECISION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::decision_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_pending_buys(&self, listing_date: NaiveDate) -> Result<Vec<PendingBuy>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, i.issue_price AS ipo_issue_price, i.symbol AS ipo_symbol
            FROM decisions d
            JOIN ipos i ON d.company = i.company
            WHERE d.decision_type = 'BUY'
              AND d.status = 'PENDING'
              AND i.listing_date = $1
            ORDER BY d.id
            "#,
            DECISION_COLUMNS
        ))
        .bind(listing_date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let issue_price: Option<Decimal> = row.get("ipo_issue_price");
                Ok(PendingBuy {
                    decision: Self::decision_from_row(row)?,
                    issue_price,
                    symbol: row.get("ipo_symbol"),
                })
            })
            .collect()
    }

    async fn decisions_for_date(&self, date: NaiveDate) -> Result<Vec<Decision>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM decisions d WHERE d.date = $1 ORDER BY d.created_at DESC",
            DECISION_COLUMNS
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decision_from_row).collect()
    }
}

// ==================== Run logs ====================

#[async_trait]
impl RunLogStore for PostgresStore {
    async fn log_run(&self, outcome: &RunOutcome) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO run_logs (run_date, run_type, status, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(outcome.run_date)
        .bind(outcome.kind.as_str())
        .bind(outcome.status.as_str())
        .bind(&outcome.details)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }

    async fn logs_for_date(&self, run_date: NaiveDate) -> Result<Vec<RunLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, run_date, run_type, status, details, created_at
            FROM run_logs
            WHERE run_date = $1
            ORDER BY created_at
            "#,
        )
        .bind(run_date)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::run_log_from_row).collect()
    }
}

// ==================== Broker sessions ====================

#[async_trait]
impl SessionTokenStore for PostgresStore {
    async fn save_access_token(&self, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("INSERT INTO broker_sessions (access_token, expires_at) VALUES ($1, $2)")
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        info!(%expires_at, "Stored broker access token");
        Ok(())
    }

    async fn valid_access_token(&self, now: DateTime<Utc>) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT access_token FROM broker_sessions
            WHERE expires_at > $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("access_token")))
    }
}
