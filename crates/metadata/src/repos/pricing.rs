//! Per-action pricing repository.

use crate::error::MetadataResult;
use async_trait::async_trait;

/// Repository for priced actions.
#[async_trait]
pub trait PricingRepo: Send + Sync {
    /// Current cost of an action in coins.
    async fn get_cost(&self, action: &str) -> MetadataResult<i64>;

    /// Set the cost of an action.
    async fn set_cost(&self, action: &str, cost: i64) -> MetadataResult<()>;
}
