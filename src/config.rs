use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub trading: TradingConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Explicit company name -> exchange symbol mapping
    #[serde(default)]
    pub symbols: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Rupees to invest per IPO
    pub investment_amount: Decimal,
    /// Stop-loss distance below the fill price, in percent (1.5 = 1.5%)
    pub stop_loss_percent: Decimal,
    /// Profit target above the fill price, in percent
    pub target_profit_percent: Decimal,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            investment_amount: Decimal::from(5000),
            stop_loss_percent: Decimal::new(15, 1),
            target_profit_percent: Decimal::from(4),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// How long to wait for the entry order to report a fill, in milliseconds
    #[serde(default = "default_fill_wait")]
    pub fill_wait_ms: u64,
    /// Polling interval for order status in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_fill_wait() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    500
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fill_wait_ms: default_fill_wait(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Kite Connect REST root
    #[serde(default = "default_kite_url")]
    pub rest_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    /// Manually supplied token, used when the store holds no valid one
    #[serde(default)]
    pub access_token: Option<String>,
    /// Exchange segment orders are routed to
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Product code (CNC = delivery)
    #[serde(default = "default_product")]
    pub product: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_kite_url() -> String {
    "https://api.kite.trade".to_string()
}

fn default_exchange() -> String {
    "NSE".to_string()
}

fn default_product() -> String {
    "CNC".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            rest_url: default_kite_url(),
            api_key: None,
            api_secret: None,
            access_token: None,
            exchange: default_exchange(),
            product: default_product(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_list_url")]
    pub ipo_list_url: String,
    #[serde(default = "default_detail_url")]
    pub ipo_detail_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_list_url() -> String {
    "https://www.nseindia.com/api/ipo-current-issue".to_string()
}

fn default_detail_url() -> String {
    "https://www.nseindia.com/api/ipo-detail".to_string()
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            ipo_list_url: default_list_url(),
            ipo_detail_url: default_detail_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("trading.investment_amount", "5000")?
            .set_default("trading.stop_loss_percent", "1.5")?
            .set_default("trading.target_profit_percent", "4")?
            .set_default("execution.fill_wait_ms", 5000)?
            .set_default("execution.poll_interval_ms", 500)?
            .set_default("database.url", "postgres://localhost/ipo_trader")?
            .set_default("database.max_connections", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("IPO_TRADER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (IPO_TRADER__TRADING__INVESTMENT_AMOUNT, etc.)
            .add_source(
                Environment::with_prefix("IPO_TRADER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration with built-in defaults, for offline runs and tests
    pub fn default_config() -> Self {
        Self {
            trading: TradingConfig::default(),
            execution: ExecutionConfig::default(),
            broker: BrokerConfig::default(),
            market_data: MarketDataConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/ipo_trader".to_string(),
                max_connections: default_max_connections(),
            },
            logging: LoggingConfig::default(),
            symbols: HashMap::new(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.trading.investment_amount <= Decimal::ZERO {
            errors.push("investment_amount must be positive".to_string());
        }

        if self.trading.stop_loss_percent <= Decimal::ZERO
            || self.trading.stop_loss_percent >= Decimal::ONE_HUNDRED
        {
            errors.push("stop_loss_percent must be between 0 and 100".to_string());
        }

        if self.trading.target_profit_percent <= Decimal::ZERO {
            errors.push("target_profit_percent must be positive".to_string());
        }

        if self.execution.poll_interval_ms == 0 {
            errors.push("poll_interval_ms must be positive".to_string());
        }

        if self.execution.poll_interval_ms > self.execution.fill_wait_ms {
            errors.push("poll_interval_ms should not exceed fill_wait_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_trading_parameters() {
        let cfg = AppConfig::default_config();
        assert_eq!(cfg.trading.investment_amount, dec!(5000));
        assert_eq!(cfg.trading.stop_loss_percent, dec!(1.5));
        assert_eq!(cfg.trading.target_profit_percent, dec!(4));
        assert_eq!(cfg.execution.fill_wait_ms, 5000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_shipped_config_loads() {
        let cfg = AppConfig::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/config")).unwrap();
        assert_eq!(cfg.trading.investment_amount, dec!(5000));
        assert_eq!(cfg.broker.exchange, "NSE");
        assert_eq!(cfg.execution.poll_interval_ms, 500);
        assert!(cfg.symbols.is_empty());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut cfg = AppConfig::default_config();
        cfg.trading.investment_amount = Decimal::ZERO;
        cfg.trading.stop_loss_percent = dec!(100);
        cfg.execution.poll_interval_ms = 0;

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
