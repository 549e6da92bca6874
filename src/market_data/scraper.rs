//! Scrape pass: refresh tracked IPOs and capture subscription snapshots.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::MarketDataSource;
use crate::domain::{IpoListing, RunKind, RunOutcome, SubscriptionSnapshot};
use crate::error::Result;
use crate::persistence::IpoStore;

/// Counts from the subscription half of a scrape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub fetched: usize,
    pub saved: usize,
    /// Already had a snapshot for (company, close date); left untouched
    pub kept: usize,
    pub missing: usize,
    pub errors: usize,
}

pub struct Scraper {
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn IpoStore>,
}

impl Scraper {
    pub fn new(source: Arc<dyn MarketDataSource>, store: Arc<dyn IpoStore>) -> Self {
        Self { source, store }
    }

    /// Fetch the current list once and run both halves against it.
    ///
    /// Returns the `SCRAPE_IPO` and `SCRAPE_SUB` outcomes; a failed list
    /// fetch fails both.
    #[instrument(skip(self))]
    pub async fn run(&self, date: NaiveDate) -> (RunOutcome, RunOutcome) {
        let listings = match self.source.fetch_current_ipo_list().await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("IPO list fetch failed: {}", e);
                let details = format!("IPO list fetch failed: {}", e);
                return (
                    RunOutcome::failed(date, RunKind::ScrapeIpo, details.clone()),
                    RunOutcome::failed(date, RunKind::ScrapeSub, details),
                );
            }
        };

        let ipo_outcome = match self.save_ipos(&listings).await {
            Ok(saved) => RunOutcome::success(date, RunKind::ScrapeIpo, format!("Scraped {} IPOs", saved)),
            Err(e) => RunOutcome::failed(date, RunKind::ScrapeIpo, e.to_string()),
        };

        let stats = self.save_snapshots(date, &listings).await;
        let mut details = format!("Scraped {} subscriptions", stats.fetched);
        if stats.kept > 0 {
            details.push_str(&format!(", {} already recorded", stats.kept));
        }
        if stats.errors > 0 {
            details.push_str(&format!(", {} errors", stats.errors));
        }
        let sub_outcome = if stats.errors > 0 && stats.fetched == 0 {
            RunOutcome::failed(date, RunKind::ScrapeSub, details)
        } else {
            RunOutcome::success(date, RunKind::ScrapeSub, details)
        };

        (ipo_outcome, sub_outcome)
    }

    async fn save_ipos(&self, listings: &[IpoListing]) -> Result<usize> {
        for listing in listings {
            self.store.upsert_ipo(&listing.to_ipo()).await?;
            info!(company = %listing.company, "{}", listing.summary());
        }
        info!("Saved {} IPOs", listings.len());
        Ok(listings.len())
    }

    /// Snapshots are keyed by the listing's close date, or the run date when
    /// the close date is unknown; an existing snapshot is never replaced
    async fn save_snapshots(&self, date: NaiveDate, listings: &[IpoListing]) -> SnapshotStats {
        let mut stats = SnapshotStats::default();

        for listing in listings.iter().filter(|l| !l.symbol.is_empty()) {
            let detail = match self.source.fetch_subscription_detail(&listing.symbol).await {
                Ok(Some(detail)) => detail,
                Ok(None) => {
                    stats.missing += 1;
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %listing.symbol, "Subscription fetch failed: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };
            stats.fetched += 1;

            let close_date = listing.close_date.unwrap_or(date);
            let snapshot = SubscriptionSnapshot::new(&listing.company, close_date, detail);
            match self.store.save_subscription(&snapshot).await {
                Ok(true) => stats.saved += 1,
                Ok(false) => stats.kept += 1,
                Err(e) => {
                    warn!(company = %listing.company, "Saving subscription failed: {}", e);
                    stats.errors += 1;
                }
            }
        }

        info!(
            fetched = stats.fetched,
            saved = stats.saved,
            kept = stats.kept,
            missing = stats.missing,
            errors = stats.errors,
            "Subscription scrape complete"
        );
        stats
    }
}
