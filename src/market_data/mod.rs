//! IPO listings and subscription figures from the exchange.

pub mod nse;
pub mod scraper;

use async_trait::async_trait;

use crate::domain::{IpoListing, SubscriptionDetail};
use crate::error::Result;

pub use nse::NseClient;
pub use scraper::{Scraper, SnapshotStats};

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// IPOs currently open or recently closed
    async fn fetch_current_ipo_list(&self) -> Result<Vec<IpoListing>>;

    /// Per-category multiples for one symbol; `None` when the source has no detail
    async fn fetch_subscription_detail(&self, symbol: &str) -> Result<Option<SubscriptionDetail>>;
}
