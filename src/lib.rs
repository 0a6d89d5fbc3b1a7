//! Betting Pool Risk Assessor
//!
//! Scores the risk of decentralized betting markets, converts the scores
//! into capital allocation weights, and screens aggregate pool state for
//! yield opportunities.
//!
//! ## Architecture
//!
//! ```text
//! LedgerGateway → FeatureEngineer → RiskScorer → PortfolioAllocator → AssessmentReport
//!       ↓
//! PoolStatistics → YieldOpportunityGenerator → opportunities
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod ml;
pub mod pipeline;
pub mod portfolio;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod types_tests;
