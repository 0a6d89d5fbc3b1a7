//! Core value types shared between the feature engineer, scorer,
//! allocator and yield generator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// One sample of a betting market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketObservation {
    pub timestamp: DateTime<Utc>,
    /// Volume bet during the sample (>= 0)
    pub betting_volume: f64,
    /// Liquidity available in the market (> 0)
    pub market_liquidity: f64,
    /// Price change since the previous sample
    pub price_change: f64,
}

impl MarketObservation {
    pub fn validate(&self) -> Result<()> {
        if !self.betting_volume.is_finite() || self.betting_volume < 0.0 {
            return Err(RiskError::validation(format!(
                "betting volume must be finite and non-negative, got {}",
                self.betting_volume
            )));
        }
        if !self.market_liquidity.is_finite() || self.market_liquidity <= 0.0 {
            return Err(RiskError::validation(format!(
                "market liquidity must be finite and positive, got {}",
                self.market_liquidity
            )));
        }
        if !self.price_change.is_finite() {
            return Err(RiskError::validation(format!(
                "price change must be finite, got {}",
                self.price_change
            )));
        }
        Ok(())
    }

    pub fn volume_risk_ratio(&self) -> f64 {
        self.betting_volume / self.market_liquidity
    }
}

/// Ordered time series of one market, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    pub market_id: String,
    pub observations: Vec<MarketObservation>,
}

impl MarketSeries {
    pub fn new(market_id: impl Into<String>, observations: Vec<MarketObservation>) -> Self {
        Self {
            market_id: market_id.into(),
            observations,
        }
    }

    pub fn latest(&self) -> Option<&MarketObservation> {
        self.observations.last()
    }

    /// Rejects empty series and any invalid observation
    pub fn validate(&self) -> Result<()> {
        if self.observations.is_empty() {
            return Err(RiskError::validation(format!(
                "market {} has no observations",
                self.market_id
            )));
        }
        for (i, obs) in self.observations.iter().enumerate() {
            obs.validate().map_err(|e| match e {
                RiskError::Validation(msg) => RiskError::validation(format!(
                    "market {} observation {}: {}",
                    self.market_id, i, msg
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Predicted probability that a market is an adverse outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub market_id: String,
    pub probability: f64,
}

/// Fraction of capital assigned to a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationWeight {
    pub market_id: String,
    pub weight: f64,
}

/// Aggregated pool state reported by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStatistics {
    pub total_locked_value: Decimal,
    /// Average risk of the pool (0-1)
    pub risk_score: Decimal,
}

impl PoolStatistics {
    pub fn validate(&self) -> Result<()> {
        if self.total_locked_value < Decimal::ZERO {
            return Err(RiskError::validation(format!(
                "total locked value must be non-negative, got {}",
                self.total_locked_value
            )));
        }
        if self.risk_score < Decimal::ZERO || self.risk_score > Decimal::ONE {
            return Err(RiskError::validation(format!(
                "pool risk score must be within [0, 1], got {}",
                self.risk_score
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

/// Candidate external yield strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldOpportunity {
    pub protocol_name: String,
    pub estimated_apy: Decimal,
    pub risk_level: RiskLevel,
}
