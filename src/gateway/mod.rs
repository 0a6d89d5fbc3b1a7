//! Collaborator interfaces
//!
//! The core never talks to a chain itself. A ledger gateway hands over
//! market series and pool statistics as plain data; transaction
//! construction, signing and broadcast stay on the gateway side.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{MarketSeries, PoolStatistics};

/// Source of market data and aggregated pool state
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Ordered market series, typically rebuilt from chain event logs
    async fn market_observations(&self) -> Result<Vec<MarketSeries>>;

    /// Snapshot of the liquidity pool
    async fn pool_statistics(&self) -> Result<PoolStatistics>;
}

/// What a capital provider has to offer to be considered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequirements {
    pub min_capital: Decimal,
    pub max_risk_score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub available_capital: Decimal,
}

/// Marketplace matching of capital providers. Interface only; no
/// implementation ships with the core.
#[cfg_attr(test, mockall::automock)]
pub trait ProviderMatcher: Send + Sync {
    fn match_providers(&self, requirements: &ProviderRequirements) -> Vec<Provider>;
}
