//! Risk-based capital allocation
//!
//! Converts per-market risk scores into capital weights. Safer markets
//! (lower risk) receive a larger share.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::types::{AllocationWeight, RiskScore};

/// How safety scores `(1 - risk)` are normalized
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// `(1 - r_i) / Σ(1 - r_j)`, weights sum to 1
    #[default]
    ComplementSum,
    /// `(1 - r_i) / Σ r_j`, heuristic score, weights need not sum to 1
    RawRiskSum,
}

/// Portfolio allocator
#[derive(Debug, Clone, Default)]
pub struct PortfolioAllocator {
    mode: NormalizationMode,
}

impl PortfolioAllocator {
    pub fn new(mode: NormalizationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Allocate capital across a complete batch of scores, preserving order
    pub fn allocate(&self, scores: &[RiskScore]) -> Result<Vec<AllocationWeight>> {
        if scores.is_empty() {
            return Err(RiskError::validation("cannot allocate over an empty batch"));
        }
        for score in scores {
            if !score.probability.is_finite() || !(0.0..=1.0).contains(&score.probability) {
                return Err(RiskError::validation(format!(
                    "risk score for market {} must be within [0, 1], got {}",
                    score.market_id, score.probability
                )));
            }
        }

        let denominator: f64 = match self.mode {
            NormalizationMode::ComplementSum => scores.iter().map(|s| 1.0 - s.probability).sum(),
            NormalizationMode::RawRiskSum => scores.iter().map(|s| s.probability).sum(),
        };

        if denominator <= 0.0 || !denominator.is_finite() {
            tracing::warn!(
                markets = scores.len(),
                mode = ?self.mode,
                denominator,
                "Degenerate allocation"
            );
            return Err(RiskError::DegenerateAllocation { denominator });
        }

        Ok(scores
            .iter()
            .map(|s| AllocationWeight {
                market_id: s.market_id.clone(),
                weight: (1.0 - s.probability) / denominator,
            })
            .collect())
    }
}
