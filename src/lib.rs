pub mod broker;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod market_data;
pub mod persistence;
pub mod strategy;

pub use broker::{BrokerClient, BrokerSessionProvider, KiteClient, KiteSessionProvider, SymbolResolver};
pub use config::AppConfig;
pub use domain::{Decision, DecisionStatus, RunKind, RunOutcome, RunStatus, Verdict};
pub use error::{Result, TraderError};
pub use market_data::{MarketDataSource, NseClient, Scraper};
pub use persistence::{MemoryStore, PostgresStore, TraderStore};
pub use strategy::{DailyOrchestrator, TradeExecutor};
