use thiserror::Error;

/// Main error type for the IPO trader
#[derive(Error, Debug)]
pub enum TraderError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Order execution errors
    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Not found: {0}")]
    NotFound(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for TraderError
pub type Result<T> = std::result::Result<T, TraderError>;

/// Broker-side failures for a single order leg
#[derive(Error, Debug, Clone)]
pub enum OrderError {
    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("Broker rejected {kind} order for {symbol}: {reason}")]
    Rejected {
        kind: String,
        symbol: String,
        reason: String,
    },

    #[error("Broker response missing order id")]
    MissingOrderId,
}

impl From<OrderError> for TraderError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Rejected { .. } => TraderError::OrderRejected(err.to_string()),
            _ => TraderError::OrderSubmission(err.to_string()),
        }
    }
}
