use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::{BrokerClient, KiteClient};
use crate::config::BrokerConfig;
use crate::persistence::SessionTokenStore;

/// Source of "an authenticated broker handle, or none"
#[async_trait]
pub trait BrokerSessionProvider: Send + Sync {
    async fn acquire(&self) -> Option<Arc<dyn BrokerClient>>;
}

/// Never yields a session; every pending trade is simulated
pub struct NoBrokerSession;

#[async_trait]
impl BrokerSessionProvider for NoBrokerSession {
    async fn acquire(&self) -> Option<Arc<dyn BrokerClient>> {
        None
    }
}

/// Always yields the same handle
pub struct FixedBrokerSession(pub Arc<dyn BrokerClient>);

#[async_trait]
impl BrokerSessionProvider for FixedBrokerSession {
    async fn acquire(&self) -> Option<Arc<dyn BrokerClient>> {
        Some(Arc::clone(&self.0))
    }
}

/// Builds a Kite handle from the stored token (or configured fallback) and
/// confirms it against the profile endpoint
pub struct KiteSessionProvider {
    config: BrokerConfig,
    tokens: Arc<dyn SessionTokenStore>,
}

impl KiteSessionProvider {
    pub fn new(config: BrokerConfig, tokens: Arc<dyn SessionTokenStore>) -> Self {
        Self { config, tokens }
    }

    async fn access_token(&self) -> Option<String> {
        match self.tokens.valid_access_token(Utc::now()).await {
            Ok(Some(token)) => return Some(token),
            Ok(None) => {}
            Err(e) => warn!("Could not read stored broker token: {}", e),
        }
        self.config.access_token.clone().filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl BrokerSessionProvider for KiteSessionProvider {
    async fn acquire(&self) -> Option<Arc<dyn BrokerClient>> {
        let Some(api_key) = self.config.api_key.clone().filter(|k| !k.is_empty()) else {
            warn!("Kite API key not configured, trading will be simulated");
            return None;
        };

        let Some(token) = self.access_token().await else {
            warn!("No Kite access token available, trading will be simulated");
            return None;
        };

        let client = match KiteClient::new(&self.config, api_key) {
            Ok(client) => client.with_access_token(token),
            Err(e) => {
                warn!("Failed to build Kite client: {}", e);
                return None;
            }
        };

        if !client.has_valid_session().await {
            warn!("Kite session rejected, trading will be simulated");
            return None;
        }

        info!("Kite session ready");
        Some(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn test_missing_api_key_yields_no_session() {
        let store = Arc::new(MemoryStore::new());
        let provider = KiteSessionProvider::new(BrokerConfig::default(), store);
        assert!(provider.acquire().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_token_yields_no_session() {
        let store = Arc::new(MemoryStore::new());
        let config = BrokerConfig {
            api_key: Some("key".to_string()),
            ..BrokerConfig::default()
        };
        let provider = KiteSessionProvider::new(config, store);
        assert!(provider.acquire().await.is_none());
    }
}
