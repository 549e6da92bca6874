use async_trait::async_trait;

use crate::domain::{OrderRequest, OrderStatusReport};
use crate::error::Result;

/// An authenticated brokerage account.
///
/// Implementations hold their own session; a handle that exists is assumed
/// usable for the duration of one execution pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Whether the held session is still accepted by the broker
    async fn has_valid_session(&self) -> bool;

    /// Submit an order and return the broker's order id.
    ///
    /// An `Err` means the broker did not accept the order.
    async fn place_order(&self, request: &OrderRequest) -> Result<String>;

    /// Latest known state of an order
    async fn get_order_status(&self, order_id: &str) -> Result<OrderStatusReport>;
}
