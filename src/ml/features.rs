//! Feature engineering for risk scoring
//!
//! Turns raw market series into a two-column feature matrix:
//! - volume risk ratio (betting volume / market liquidity)
//! - historical volatility (rolling std-dev of price change)
//!
//! Volatility is `None` until a market has a full window of history.
//! Missing values are never coerced to zero.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};
use crate::types::MarketSeries;

/// Configuration for feature extraction
#[derive(Debug, Clone)]
pub struct FeatureConfig {
    /// Rolling window for volatility, in samples
    pub rolling_window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { rolling_window: 30 }
    }
}

/// Features of a single market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub market_id: String,
    pub volume_risk_ratio: f64,
    pub historical_volatility: Option<f64>,
}

impl FeatureRow {
    pub fn is_complete(&self) -> bool {
        self.historical_volatility.is_some()
    }

    /// Dense vector for the classifier, `None` if volatility is missing
    pub fn to_vector(&self) -> Option<Vec<f64>> {
        self.historical_volatility
            .map(|vol| vec![self.volume_risk_ratio, vol])
    }

    pub fn feature_names() -> [&'static str; 2] {
        ["volume_risk_ratio", "historical_volatility"]
    }

    /// Rejects rows whose derived values overflowed
    pub fn ensure_finite(&self) -> Result<()> {
        let vol_ok = self.historical_volatility.map_or(true, f64::is_finite);
        if self.volume_risk_ratio.is_finite() && vol_ok {
            return Ok(());
        }
        Err(RiskError::validation(format!(
            "market {} has non-finite features (volume_risk_ratio {}, historical_volatility {:?})",
            self.market_id, self.volume_risk_ratio, self.historical_volatility
        )))
    }
}

/// Scaled feature rows plus the scaler that produced them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub rows: Vec<FeatureRow>,
    pub scaler: FeatureScaler,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-column mean / standard deviation, fitted once and reused
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub ratio_mean: f64,
    pub ratio_scale: f64,
    pub volatility_mean: f64,
    pub volatility_scale: f64,
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self {
            ratio_mean: 0.0,
            ratio_scale: 1.0,
            volatility_mean: 0.0,
            volatility_scale: 1.0,
        }
    }
}

impl FeatureScaler {
    /// Fit on unscaled rows. Missing volatility values are skipped.
    pub fn fit(rows: &[FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(RiskError::validation("cannot fit feature scaler on an empty batch"));
        }

        let ratios: Vec<f64> = rows.iter().map(|r| r.volume_risk_ratio).collect();
        let vols: Vec<f64> = rows.iter().filter_map(|r| r.historical_volatility).collect();

        let (ratio_mean, ratio_scale) = mean_and_scale(&ratios);
        let (volatility_mean, volatility_scale) = mean_and_scale(&vols);

        let scaler = Self {
            ratio_mean,
            ratio_scale,
            volatility_mean,
            volatility_scale,
        };
        scaler.ensure_finite()?;
        Ok(scaler)
    }

    /// Every parameter must be finite and every scale positive
    pub fn ensure_finite(&self) -> Result<()> {
        let params = [
            ("ratio_mean", self.ratio_mean),
            ("ratio_scale", self.ratio_scale),
            ("volatility_mean", self.volatility_mean),
            ("volatility_scale", self.volatility_scale),
        ];
        for (name, value) in params {
            if !value.is_finite() {
                return Err(RiskError::validation(format!(
                    "feature scaler {} is not finite ({})",
                    name, value
                )));
            }
        }
        if self.ratio_scale <= 0.0 || self.volatility_scale <= 0.0 {
            return Err(RiskError::validation("feature scaler scales must be positive"));
        }
        Ok(())
    }

    pub fn transform_row(&self, row: &FeatureRow) -> FeatureRow {
        FeatureRow {
            market_id: row.market_id.clone(),
            volume_risk_ratio: (row.volume_risk_ratio - self.ratio_mean) / self.ratio_scale,
            historical_volatility: row
                .historical_volatility
                .map(|v| (v - self.volatility_mean) / self.volatility_scale),
        }
    }
}

/// Population mean and std-dev; zero variance (or no data) scales by 1
fn mean_and_scale(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std > f64::EPSILON {
        (mean, std)
    } else {
        (mean, 1.0)
    }
}

/// Scale rows, failing on the first one that leaves the finite range
fn scale_rows(scaler: &FeatureScaler, raw: &[FeatureRow]) -> Result<Vec<FeatureRow>> {
    raw.iter()
        .map(|r| {
            let scaled = scaler.transform_row(r);
            scaled.ensure_finite()?;
            Ok(scaled)
        })
        .collect()
}

/// Sample std-dev (n - 1 denominator)
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Feature engineer
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(FeatureConfig::default())
    }

    pub fn window(&self) -> usize {
        self.config.rolling_window
    }

    /// Unscaled features, one row per market from its latest observation
    pub fn raw_features(&self, batch: &[MarketSeries]) -> Result<Vec<FeatureRow>> {
        batch
            .iter()
            .map(|series| {
                series.validate()?;
                let latest = series.latest().ok_or_else(|| {
                    RiskError::validation(format!("market {} has no observations", series.market_id))
                })?;
                let row = FeatureRow {
                    market_id: series.market_id.clone(),
                    volume_risk_ratio: latest.volume_risk_ratio(),
                    historical_volatility: self.latest_volatility(series),
                };
                row.ensure_finite()?;
                Ok(row)
            })
            .collect()
    }

    /// Batch-local fit-transform: scaler parameters come from this batch only,
    /// so scales are not comparable across calls. Use `transform` with a
    /// persisted scaler for inference.
    pub fn compute_features(&self, batch: &[MarketSeries]) -> Result<FeatureMatrix> {
        let raw = self.raw_features(batch)?;
        if raw.is_empty() {
            return Ok(FeatureMatrix {
                rows: Vec::new(),
                scaler: FeatureScaler::default(),
            });
        }

        let scaler = FeatureScaler::fit(&raw)?;
        let rows = scale_rows(&scaler, &raw)?;
        Ok(FeatureMatrix { rows, scaler })
    }

    /// Scale a batch with fixed, previously fitted parameters
    pub fn transform(&self, batch: &[MarketSeries], scaler: &FeatureScaler) -> Result<FeatureMatrix> {
        scaler.ensure_finite()?;
        let raw = self.raw_features(batch)?;
        let rows = scale_rows(scaler, &raw)?;
        Ok(FeatureMatrix {
            rows,
            scaler: *scaler,
        })
    }

    /// Rolling volatility for every observation of a series
    pub fn rolling_volatility(&self, series: &MarketSeries) -> Vec<Option<f64>> {
        let window = self.config.rolling_window;
        let changes: Vec<f64> = series.observations.iter().map(|o| o.price_change).collect();

        (0..changes.len())
            .map(|i| {
                if window < 2 || i + 1 < window {
                    None
                } else {
                    Some(sample_std(&changes[i + 1 - window..=i]))
                }
            })
            .collect()
    }

    /// Unscaled rows for every observation with a full window of history,
    /// used to assemble training sets.
    pub fn training_rows(&self, series: &MarketSeries) -> Result<Vec<FeatureRow>> {
        series.validate()?;
        let vols = self.rolling_volatility(series);

        let mut rows = Vec::new();
        for (obs, vol) in series.observations.iter().zip(vols) {
            let Some(v) = vol else { continue };
            let row = FeatureRow {
                market_id: series.market_id.clone(),
                volume_risk_ratio: obs.volume_risk_ratio(),
                historical_volatility: Some(v),
            };
            row.ensure_finite()?;
            rows.push(row);
        }
        Ok(rows)
    }

    fn latest_volatility(&self, series: &MarketSeries) -> Option<f64> {
        let window = self.config.rolling_window;
        let n = series.observations.len();
        if window < 2 || n < window {
            return None;
        }
        let changes: Vec<f64> = series.observations[n - window..]
            .iter()
            .map(|o| o.price_change)
            .collect();
        Some(sample_std(&changes))
    }
}
