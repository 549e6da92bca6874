//! Decision and execution pipeline.
//!
//! - `rules` - oversubscription rule, snapshot -> BUY/SKIP + justification
//! - `sizing` - share quantity and bracket prices
//! - `executor` - listing-day entry, fill resolution and bracket orders
//! - `orchestrator` - daily evaluation, trading and scrape passes

pub mod executor;
pub mod orchestrator;
pub mod rules;
pub mod sizing;

pub use executor::{ExecutionResult, FillQuality, TradeExecutor, TradeOutcome, UnrecordedTrade};
pub use orchestrator::{DailyOrchestrator, TradeTally};
pub use rules::{evaluate, Evaluation, NO_SUBSCRIPTION_DATA};
pub use sizing::{bracket_prices, quantity, BracketPrices};
