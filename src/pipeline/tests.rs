use super::*;
use crate::gateway::MockLedgerGateway;
use crate::ml::{ForestParams, TrainingSample};
use crate::portfolio::NormalizationMode;
use crate::types::MarketObservation;
use chrono::Duration;
use rust_decimal_macros::dec;

const WINDOW: usize = 8;

fn market(id: &str, n: usize, volume: f64, swing: f64) -> MarketSeries {
    let start = Utc::now();
    let observations = (0..n)
        .map(|i| MarketObservation {
            timestamp: start + Duration::hours(i as i64),
            betting_volume: volume,
            market_liquidity: 1000.0,
            price_change: if i % 2 == 0 { swing } else { -swing },
        })
        .collect();
    MarketSeries::new(id, observations)
}

fn trained_scorer() -> Arc<RiskScorer> {
    let engineer = FeatureEngineer::new(FeatureConfig { rolling_window: WINDOW });
    let mut samples = Vec::new();
    for k in 0..5 {
        let offset = k as f64;
        let safe = market("safe", 16, 40.0 + offset * 10.0, 0.004 + offset * 0.001);
        let risky = market("risky", 16, 700.0 + offset * 30.0, 0.07 + offset * 0.01);
        for row in engineer.training_rows(&safe).unwrap() {
            samples.push(TrainingSample { features: row, adverse: false });
        }
        for row in engineer.training_rows(&risky).unwrap() {
            samples.push(TrainingSample { features: row, adverse: true });
        }
    }
    let params = ForestParams {
        n_trees: 20,
        ..Default::default()
    };
    Arc::new(RiskScorer::fit(&samples, params).unwrap())
}

fn pipeline(scorer: Arc<RiskScorer>) -> AssessmentPipeline {
    AssessmentPipeline::new(
        FeatureEngineer::new(FeatureConfig { rolling_window: WINDOW }),
        scorer,
        PortfolioAllocator::default(),
        YieldOpportunityGenerator::default(),
    )
}

#[test]
fn test_assess_allocates_more_to_safe_market() {
    let pipeline = pipeline(trained_scorer());
    let markets = vec![market("calm", 10, 55.0, 0.005), market("wild", 10, 760.0, 0.09)];

    let report = pipeline.assess(&markets).unwrap();

    assert_eq!(report.scores.len(), 2);
    assert_eq!(report.allocations.len(), 2);
    assert_eq!(report.allocations[0].market_id, "calm");
    assert!(report.allocations[0].weight > report.allocations[1].weight);
    let total: f64 = report.allocations.iter().map(|a| a.weight).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(report.skipped_markets.is_empty());
}

#[test]
fn test_short_history_fails_whole_batch() {
    let pipeline = pipeline(trained_scorer());
    let markets = vec![market("calm", 10, 55.0, 0.005), market("new", 3, 60.0, 0.005)];

    let err = pipeline.assess(&markets).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_short_history_dropped_when_configured() {
    let pipeline = pipeline(trained_scorer()).with_drop_incomplete(true);
    let markets = vec![
        market("calm", 10, 55.0, 0.005),
        market("new", 3, 60.0, 0.005),
        market("wild", 10, 760.0, 0.09),
    ];

    let report = pipeline.assess(&markets).unwrap();

    assert_eq!(report.skipped_markets, vec!["new".to_string()]);
    let ids: Vec<&str> = report.allocations.iter().map(|a| a.market_id.as_str()).collect();
    assert_eq!(ids, vec!["calm", "wild"]);
}

#[test]
fn test_unfitted_model_stops_assessment() {
    let pipeline = pipeline(Arc::new(RiskScorer::unfitted()));
    let markets = vec![market("calm", 10, 55.0, 0.005)];

    assert!(matches!(pipeline.assess(&markets), Err(RiskError::ModelNotFitted)));
}

#[test]
fn test_zero_liquidity_is_validation_error() {
    let pipeline = pipeline(trained_scorer());
    let mut bad = market("bad", 10, 55.0, 0.005);
    bad.observations[9].market_liquidity = 0.0;

    assert!(pipeline.assess(&[bad]).unwrap_err().is_validation());
}

#[test]
fn test_raw_risk_sum_mode_from_config() {
    let mut config = Config::default();
    config.features.rolling_window = WINDOW;
    config.allocation.normalization = NormalizationMode::RawRiskSum;
    let pipeline = AssessmentPipeline::from_config(&config, trained_scorer());

    let markets = vec![market("calm", 10, 55.0, 0.005), market("wild", 10, 760.0, 0.09)];
    let report = pipeline.assess(&markets).unwrap();

    let risk_sum: f64 = report.scores.iter().map(|s| s.probability).sum();
    for (w, s) in report.allocations.iter().zip(&report.scores) {
        assert_eq!(w.weight, (1.0 - s.probability) / risk_sum);
    }
}

#[test]
fn test_yield_report_rejects_invalid_stats() {
    let pipeline = pipeline(trained_scorer());
    let stats = PoolStatistics {
        total_locked_value: dec!(-1),
        risk_score: dec!(0.1),
    };
    assert!(pipeline.yield_report(&stats).unwrap_err().is_validation());
}

#[tokio::test]
async fn test_run_with_gateway_snapshot() {
    let markets = vec![
        market("m1", 10, 55.0, 0.005),
        market("m2", 10, 760.0, 0.09),
        market("m3", 10, 45.0, 0.004),
    ];
    let mut gateway = MockLedgerGateway::new();
    let snapshot = markets.clone();
    gateway
        .expect_market_observations()
        .times(1)
        .returning(move || Ok(snapshot.clone()));
    gateway.expect_pool_statistics().times(1).returning(|| {
        Ok(PoolStatistics {
            total_locked_value: dec!(600000),
            risk_score: dec!(0.1),
        })
    });

    let pipeline = pipeline(trained_scorer());
    let output = pipeline.run(&gateway).await.unwrap();

    let ids: Vec<&str> = output
        .assessment
        .scores
        .iter()
        .map(|s| s.market_id.as_str())
        .collect();
    assert_eq!(ids, vec!["m1", "m2", "m3"]);
    assert_eq!(output.opportunities.len(), 2);

    // Parallel scoring matches sequential scoring
    let sequential = pipeline.assess(&markets).unwrap();
    assert_eq!(sequential.scores, output.assessment.scores);
}

#[tokio::test]
async fn test_run_surfaces_gateway_failure() {
    let mut gateway = MockLedgerGateway::new();
    gateway
        .expect_market_observations()
        .returning(|| Err(RiskError::gateway("rpc unavailable")));
    gateway.expect_pool_statistics().returning(|| {
        Ok(PoolStatistics {
            total_locked_value: dec!(0),
            risk_score: dec!(0),
        })
    });

    let pipeline = pipeline(trained_scorer());
    let err = pipeline.run(&gateway).await.unwrap_err();
    assert!(matches!(err, RiskError::Gateway(_)));
}

#[test]
fn test_run_rejects_empty_snapshot() {
    let mut gateway = MockLedgerGateway::new();
    gateway.expect_market_observations().returning(|| Ok(Vec::new()));
    gateway.expect_pool_statistics().returning(|| {
        Ok(PoolStatistics {
            total_locked_value: dec!(0),
            risk_score: dec!(0),
        })
    });

    let pipeline = pipeline(trained_scorer());
    let result = tokio_test::block_on(pipeline.run(&gateway));
    assert!(result.unwrap_err().is_validation());
}
