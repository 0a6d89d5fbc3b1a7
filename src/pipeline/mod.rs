//! Assessment pipeline
//!
//! ```text
//! MarketSeries → FeatureEngineer → RiskScorer (per market) → PortfolioAllocator
//! PoolStatistics → YieldOpportunityGenerator
//! ```
//!
//! Scores are collected in input order and the whole batch fails if any
//! market cannot be scored, so the allocator never sees a partial portfolio.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, RiskError};
use crate::gateway::LedgerGateway;
use crate::ml::{FeatureConfig, FeatureEngineer, FeatureRow, RiskScorer};
use crate::portfolio::PortfolioAllocator;
use crate::strategy::YieldOpportunityGenerator;
use crate::types::{AllocationWeight, MarketSeries, PoolStatistics, RiskScore, YieldOpportunity};

/// Result of scoring and allocating one batch of markets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub generated_at: DateTime<Utc>,
    pub scores: Vec<RiskScore>,
    pub allocations: Vec<AllocationWeight>,
    /// Markets dropped for lack of history
    pub skipped_markets: Vec<String>,
}

/// Everything produced from one gateway snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub assessment: AssessmentReport,
    pub pool: PoolStatistics,
    pub opportunities: Vec<YieldOpportunity>,
}

pub struct AssessmentPipeline {
    engineer: FeatureEngineer,
    scorer: Arc<RiskScorer>,
    allocator: PortfolioAllocator,
    yield_generator: YieldOpportunityGenerator,
    drop_incomplete: bool,
}

impl AssessmentPipeline {
    pub fn new(
        engineer: FeatureEngineer,
        scorer: Arc<RiskScorer>,
        allocator: PortfolioAllocator,
        yield_generator: YieldOpportunityGenerator,
    ) -> Self {
        Self {
            engineer,
            scorer,
            allocator,
            yield_generator,
            drop_incomplete: false,
        }
    }

    pub fn from_config(config: &Config, scorer: Arc<RiskScorer>) -> Self {
        Self::new(
            FeatureEngineer::new(FeatureConfig {
                rolling_window: config.features.rolling_window,
            }),
            scorer,
            PortfolioAllocator::new(config.allocation.normalization),
            YieldOpportunityGenerator::new(config.yield_rules.rules.clone()),
        )
        .with_drop_incomplete(config.features.drop_incomplete)
    }

    /// Drop markets without a full volatility window instead of failing
    pub fn with_drop_incomplete(mut self, drop_incomplete: bool) -> Self {
        self.drop_incomplete = drop_incomplete;
        self
    }

    /// Scaled rows ready for scoring, plus the ids of dropped markets
    fn prepare(&self, markets: &[MarketSeries]) -> Result<(Vec<FeatureRow>, Vec<String>)> {
        if markets.is_empty() {
            return Err(RiskError::validation("no markets to assess"));
        }

        let scaler = self.scorer.scaler()?;
        let matrix = self.engineer.transform(markets, &scaler)?;

        if !self.drop_incomplete {
            return Ok((matrix.rows, Vec::new()));
        }

        let (rows, incomplete): (Vec<FeatureRow>, Vec<FeatureRow>) =
            matrix.rows.into_iter().partition(FeatureRow::is_complete);
        let skipped: Vec<String> = incomplete.into_iter().map(|r| r.market_id).collect();
        if !skipped.is_empty() {
            tracing::warn!(
                skipped = skipped.len(),
                window = self.engineer.window(),
                "Dropping markets without enough history"
            );
        }
        Ok((rows, skipped))
    }

    fn report(&self, scores: Vec<RiskScore>, skipped_markets: Vec<String>) -> Result<AssessmentReport> {
        let allocations = self.allocator.allocate(&scores)?;
        tracing::info!(
            markets = scores.len(),
            skipped = skipped_markets.len(),
            "Allocation computed"
        );
        Ok(AssessmentReport {
            generated_at: Utc::now(),
            scores,
            allocations,
            skipped_markets,
        })
    }

    /// Score and allocate a batch synchronously
    pub fn assess(&self, markets: &[MarketSeries]) -> Result<AssessmentReport> {
        let (rows, skipped) = self.prepare(markets)?;
        let scores = self.scorer.score_batch(&rows)?;
        self.report(scores, skipped)
    }

    pub fn yield_report(&self, stats: &PoolStatistics) -> Result<Vec<YieldOpportunity>> {
        stats.validate()?;
        let opportunities = self.yield_generator.generate_opportunities(stats);
        tracing::debug!(
            tvl = %stats.total_locked_value,
            risk = %stats.risk_score,
            matched = opportunities.len(),
            "Yield rules evaluated"
        );
        Ok(opportunities)
    }

    /// Pull a snapshot from the gateway, score markets on the blocking
    /// pool and join them back in input order before allocating.
    pub async fn run(&self, gateway: &dyn LedgerGateway) -> Result<PipelineOutput> {
        let (markets, pool) =
            tokio::try_join!(gateway.market_observations(), gateway.pool_statistics())?;
        tracing::info!(markets = markets.len(), "Fetched ledger snapshot");

        let (rows, skipped) = self.prepare(&markets)?;

        let tasks = rows.into_iter().map(|row| {
            let scorer = Arc::clone(&self.scorer);
            tokio::task::spawn_blocking(move || scorer.score_risk(&row))
        });
        let scores = futures_util::future::try_join_all(tasks)
            .await?
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let assessment = self.report(scores, skipped)?;
        let opportunities = self.yield_report(&pool)?;

        Ok(PipelineOutput {
            assessment,
            pool,
            opportunities,
        })
    }
}

#[cfg(test)]
mod tests;
