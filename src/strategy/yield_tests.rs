//! Tests for yield opportunity rules

#[cfg(test)]
mod tests {
    use super::super::yield_rules::*;
    use crate::types::{PoolStatistics, RiskLevel};
    use rust_decimal_macros::dec;

    fn stats(tvl: rust_decimal::Decimal, risk: rust_decimal::Decimal) -> PoolStatistics {
        PoolStatistics {
            total_locked_value: tvl,
            risk_score: risk,
        }
    }

    #[test]
    fn test_large_safe_pool_gets_both_rows_in_order() {
        let generator = YieldOpportunityGenerator::default();
        let result = generator.generate_opportunities(&stats(dec!(600000), dec!(0.1)));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].protocol_name, "Decentralized Lending Platform");
        assert_eq!(result[0].estimated_apy, dec!(0.075));
        assert_eq!(result[0].risk_level, RiskLevel::Low);
        assert_eq!(result[1].protocol_name, "Liquidity Staking");
        assert_eq!(result[1].estimated_apy, dec!(0.12));
        assert_eq!(result[1].risk_level, RiskLevel::VeryLow);
    }

    #[test]
    fn test_small_risky_pool_gets_nothing() {
        let generator = YieldOpportunityGenerator::default();
        assert!(generator
            .generate_opportunities(&stats(dec!(50000), dec!(0.9)))
            .is_empty());
    }

    #[test]
    fn test_mid_pool_gets_lending_only() {
        let generator = YieldOpportunityGenerator::default();
        let result = generator.generate_opportunities(&stats(dec!(200000), dec!(0.3)));

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].protocol_name, "Decentralized Lending Platform");
    }

    #[test]
    fn test_large_pool_with_moderate_risk_skips_staking() {
        let generator = YieldOpportunityGenerator::default();
        let result = generator.generate_opportunities(&stats(dec!(900000), dec!(0.25)));

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let generator = YieldOpportunityGenerator::default();

        assert!(generator
            .generate_opportunities(&stats(dec!(100000), dec!(0.1)))
            .is_empty());
        assert!(generator
            .generate_opportunities(&stats(dec!(150000), dec!(0.4)))
            .is_empty());
    }

    #[test]
    fn test_output_follows_rule_order_not_apy() {
        let rules = vec![
            YieldRule {
                protocol_name: "High".to_string(),
                min_total_locked_value: dec!(0),
                max_risk_score: dec!(1),
                estimated_apy: dec!(0.30),
                risk_level: RiskLevel::High,
            },
            YieldRule {
                protocol_name: "Medium".to_string(),
                min_total_locked_value: dec!(0),
                max_risk_score: dec!(1),
                estimated_apy: dec!(0.05),
                risk_level: RiskLevel::Medium,
            },
        ];
        let generator = YieldOpportunityGenerator::new(rules);
        let result = generator.generate_opportunities(&stats(dec!(10), dec!(0.5)));

        let names: Vec<&str> = result.iter().map(|o| o.protocol_name.as_str()).collect();
        assert_eq!(names, vec!["High", "Medium"]);
    }

    #[test]
    fn test_rule_from_toml() {
        let toml_str = r#"
protocol_name = "Vault"
min_total_locked_value = 250000
max_risk_score = 0.3
estimated_apy = 0.09
risk_level = "medium"
"#;
        let rule: YieldRule = toml::from_str(toml_str).unwrap();
        assert_eq!(rule.protocol_name, "Vault");
        assert_eq!(rule.min_total_locked_value, dec!(250000));
        assert_eq!(rule.max_risk_score, dec!(0.3));
        assert_eq!(rule.risk_level, RiskLevel::Medium);
    }
}
