//! Yield opportunity rules
//!
//! A small rule engine over aggregate pool state. Every rule whose
//! conditions hold fires; output keeps rule order and is not re-sorted
//! by APY.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{PoolStatistics, RiskLevel, YieldOpportunity};

/// One row of the rule table. Both bounds are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldRule {
    pub protocol_name: String,
    /// Fires only when total locked value is strictly above this
    pub min_total_locked_value: Decimal,
    /// Fires only when pool risk is strictly below this
    pub max_risk_score: Decimal,
    pub estimated_apy: Decimal,
    pub risk_level: RiskLevel,
}

impl YieldRule {
    pub fn matches(&self, stats: &PoolStatistics) -> bool {
        stats.total_locked_value > self.min_total_locked_value
            && stats.risk_score < self.max_risk_score
    }

    pub fn opportunity(&self) -> YieldOpportunity {
        YieldOpportunity {
            protocol_name: self.protocol_name.clone(),
            estimated_apy: self.estimated_apy,
            risk_level: self.risk_level,
        }
    }
}

pub fn default_yield_rules() -> Vec<YieldRule> {
    vec![
        YieldRule {
            protocol_name: "Decentralized Lending Platform".to_string(),
            min_total_locked_value: dec!(100000),
            max_risk_score: dec!(0.4),
            estimated_apy: dec!(0.075),
            risk_level: RiskLevel::Low,
        },
        YieldRule {
            protocol_name: "Liquidity Staking".to_string(),
            min_total_locked_value: dec!(500000),
            max_risk_score: dec!(0.2),
            estimated_apy: dec!(0.12),
            risk_level: RiskLevel::VeryLow,
        },
    ]
}

/// Evaluates the configured rule table against pool statistics
#[derive(Debug, Clone)]
pub struct YieldOpportunityGenerator {
    rules: Vec<YieldRule>,
}

impl Default for YieldOpportunityGenerator {
    fn default() -> Self {
        Self::new(default_yield_rules())
    }
}

impl YieldOpportunityGenerator {
    pub fn new(rules: Vec<YieldRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[YieldRule] {
        &self.rules
    }

    /// All matching opportunities, in rule order. No match is an empty list.
    pub fn generate_opportunities(&self, stats: &PoolStatistics) -> Vec<YieldOpportunity> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(stats))
            .map(YieldRule::opportunity)
            .collect()
    }
}
