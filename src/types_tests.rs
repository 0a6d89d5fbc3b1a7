//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn observation(volume: f64, liquidity: f64, change: f64) -> MarketObservation {
        MarketObservation {
            timestamp: Utc::now(),
            betting_volume: volume,
            market_liquidity: liquidity,
            price_change: change,
        }
    }

    #[test]
    fn test_volume_risk_ratio() {
        let obs = observation(250.0, 1000.0, 0.01);
        assert_eq!(obs.volume_risk_ratio(), 0.25);
    }

    #[test]
    fn test_observation_validation() {
        assert!(observation(0.0, 1.0, 0.0).validate().is_ok());
        assert!(observation(1.0, 0.0, 0.0).validate().is_err());
        assert!(observation(1.0, -5.0, 0.0).validate().is_err());
        assert!(observation(-1.0, 10.0, 0.0).validate().is_err());
        assert!(observation(1.0, 10.0, f64::INFINITY).validate().is_err());
        assert!(observation(f64::NAN, 10.0, 0.0).validate().is_err());
    }

    #[test]
    fn test_series_validation_names_market() {
        let series = MarketSeries::new(
            "m-42",
            vec![observation(1.0, 10.0, 0.0), observation(1.0, 0.0, 0.0)],
        );
        let err = series.validate().unwrap_err();
        assert!(err.to_string().contains("m-42"));
        assert!(err.to_string().contains("observation 1"));
    }

    #[test]
    fn test_series_latest() {
        let series = MarketSeries::new(
            "m",
            vec![observation(1.0, 10.0, 0.0), observation(2.0, 10.0, 0.0)],
        );
        assert_eq!(series.latest().unwrap().betting_volume, 2.0);
        assert!(MarketSeries::new("empty", vec![]).latest().is_none());
    }

    #[test]
    fn test_pool_statistics_validation() {
        let ok = PoolStatistics {
            total_locked_value: dec!(1000),
            risk_score: dec!(0.5),
        };
        assert!(ok.validate().is_ok());

        let negative = PoolStatistics {
            total_locked_value: dec!(-1),
            risk_score: dec!(0.5),
        };
        assert!(negative.validate().is_err());

        let out_of_range = PoolStatistics {
            total_locked_value: dec!(1000),
            risk_score: dec!(1.2),
        };
        assert!(out_of_range.validate().is_err());
    }

    #[test]
    fn test_risk_level_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::VeryLow).unwrap(), "\"very_low\"");
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
        let level: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn test_market_series_from_json() {
        let json = r#"{
            "market_id": "election-2026",
            "observations": [
                {"timestamp": "2026-01-01T00:00:00Z", "betting_volume": 120.5, "market_liquidity": 5000.0, "price_change": 0.02}
            ]
        }"#;
        let series: MarketSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.market_id, "election-2026");
        assert_eq!(series.observations.len(), 1);
        assert_eq!(series.observations[0].market_liquidity, 5000.0);
    }
}
