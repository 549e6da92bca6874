use ipo_trader::broker::{BrokerSessionProvider, KiteSessionProvider, NoBrokerSession};
use ipo_trader::config::{AppConfig, LoggingConfig};
use ipo_trader::error::Result;
use ipo_trader::market_data::NseClient;
use ipo_trader::persistence::TraderStore;
use ipo_trader::strategy::DailyOrchestrator;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Wire the NSE source and Kite session provider around `store`
pub fn build_orchestrator<S>(store: Arc<S>, config: &AppConfig) -> Result<DailyOrchestrator>
where
    S: TraderStore + 'static,
{
    let market_data = Arc::new(NseClient::new(&config.market_data)?);

    let sessions: Arc<dyn BrokerSessionProvider> =
        if config.broker.api_key.as_deref().map_or(true, str::is_empty) {
            warn!("Kite API key not configured, trades will be simulated");
            Arc::new(NoBrokerSession)
        } else {
            Arc::new(KiteSessionProvider::new(config.broker.clone(), store.clone()))
        };

    Ok(DailyOrchestrator::new(store, market_data, sessions, config))
}

pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},ipo_trader=debug,sqlx=warn", config.level))
    });

    let log_dir = std::env::var("IPO_TRADER_LOG_DIR").ok();

    // `tracing_appender::rolling::daily` panics if it cannot create the
    // initial file, so writability is checked first
    let file_layer = log_dir.as_deref().and_then(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Could not create log directory {} ({}), file logging disabled",
                log_dir, e
            );
            return None;
        }

        let test_path = std::path::Path::new(log_dir).join(".ipo_trader_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(log_dir, "ipo-trader.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Flushes on drop; the process exits right after the run
                Box::leak(Box::new(guard));

                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                None
            }
        }
    });

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_target(true));
    let console_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
    });

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/ipo-trader.log", dir);
    }
}
