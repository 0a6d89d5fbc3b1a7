//! Risk scorer
//!
//! Wraps a fitted random forest together with the feature scaler it was
//! trained against. The fitted model is immutable and shared behind an
//! `Arc`, so one scorer can serve concurrent read-only scoring.
//!
//! Usage:
//! ```ignore
//! let scorer = RiskScorer::fit(&samples, ForestParams::default())?;
//! scorer.save(&path)?;
//! let scorer = RiskScorer::load(&path)?;
//! let score = scorer.score_risk(&row)?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use super::features::{FeatureEngineer, FeatureRow, FeatureScaler};
use super::forest::{ForestParams, RandomForest};
use crate::error::{Result, RiskError};
use crate::types::{MarketSeries, RiskScore};

const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Labelled, unscaled training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureRow,
    /// Market turned out to be an adverse outcome
    pub adverse: bool,
}

/// Historical market series with its known outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledSeries {
    #[serde(flatten)]
    pub series: MarketSeries,
    pub adverse: bool,
}

impl TrainingSample {
    /// Expand labelled series into one sample per observation with a full
    /// volatility window
    pub fn from_labelled(engineer: &FeatureEngineer, labelled: &[LabelledSeries]) -> Result<Vec<Self>> {
        let mut samples = Vec::new();
        for item in labelled {
            let rows = engineer.training_rows(&item.series)?;
            if rows.is_empty() {
                tracing::debug!(
                    market = %item.series.market_id,
                    window = engineer.window(),
                    "Series shorter than window, no samples"
                );
            }
            samples.extend(rows.into_iter().map(|features| TrainingSample {
                features,
                adverse: item.adverse,
            }));
        }
        Ok(samples)
    }
}

/// Everything needed at inference time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub scaler: FeatureScaler,
    pub forest: RandomForest,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
    /// Share of adverse labels in the training set
    pub adverse_rate: f64,
}

/// On-disk wrapper around a serialized model
#[derive(Debug, Serialize, Deserialize)]
struct ModelArtifact {
    format_version: u32,
    created_at: DateTime<Utc>,
    checksum: String,
    payload: String,
}

fn checksum(payload: &str) -> String {
    hex::encode(Sha256::digest(payload.as_bytes()))
}

#[derive(Debug, Clone, Default)]
pub struct RiskScorer {
    model: Option<Arc<FittedModel>>,
}

impl RiskScorer {
    /// Scorer without a model; every non-empty scoring request fails
    pub fn unfitted() -> Self {
        Self { model: None }
    }

    pub fn from_model(model: FittedModel) -> Self {
        Self {
            model: Some(Arc::new(model)),
        }
    }

    /// Fit scaler and forest on unscaled samples
    pub fn fit(samples: &[TrainingSample], params: ForestParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(RiskError::validation("training set is empty"));
        }
        if let Some(bad) = samples.iter().find(|s| !s.features.is_complete()) {
            return Err(RiskError::validation(format!(
                "training sample for market {} is missing historical volatility",
                bad.features.market_id
            )));
        }

        let rows: Vec<FeatureRow> = samples.iter().map(|s| s.features.clone()).collect();
        let scaler = FeatureScaler::fit(&rows)?;

        let x: Vec<Vec<f64>> = rows
            .iter()
            .filter_map(|r| scaler.transform_row(r).to_vector())
            .collect();
        let y: Vec<bool> = samples.iter().map(|s| s.adverse).collect();

        let forest = RandomForest::fit(&x, &y, params)?;
        let adverse_rate = y.iter().filter(|&&a| a).count() as f64 / y.len() as f64;

        tracing::info!(
            samples = samples.len(),
            trees = forest.n_trees(),
            adverse_rate,
            "Risk model trained"
        );

        Ok(Self::from_model(FittedModel {
            scaler,
            forest,
            trained_at: Utc::now(),
            training_samples: samples.len(),
            adverse_rate,
        }))
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&FittedModel> {
        self.model.as_deref().ok_or(RiskError::ModelNotFitted)
    }

    /// Scaler to use when transforming inference batches
    pub fn scaler(&self) -> Result<FeatureScaler> {
        Ok(self.model()?.scaler)
    }

    /// Score one market from its scaled features
    pub fn score_risk(&self, row: &FeatureRow) -> Result<RiskScore> {
        let model = self.model()?;
        let vector = row.to_vector().ok_or_else(|| {
            RiskError::validation(format!(
                "market {} is missing historical volatility",
                row.market_id
            ))
        })?;

        let probability = model.forest.predict_proba(&vector)?;
        Ok(RiskScore {
            market_id: row.market_id.clone(),
            probability,
        })
    }

    /// Score a batch in order. Fails as a whole if any market fails;
    /// an empty batch yields no scores.
    pub fn score_batch(&self, rows: &[FeatureRow]) -> Result<Vec<RiskScore>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        rows.iter().map(|row| self.score_risk(row)).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let model = self.model()?;
        let payload = serde_json::to_string(model)?;
        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            checksum: checksum(&payload),
            payload,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&artifact)?)?;

        tracing::info!(path = %path.display(), checksum = %artifact.checksum, "Risk model saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&content)?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(RiskError::artifact(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        let actual = checksum(&artifact.payload);
        if actual != artifact.checksum {
            return Err(RiskError::artifact(format!(
                "checksum mismatch: recorded {}, computed {}",
                artifact.checksum, actual
            )));
        }

        let model: FittedModel = serde_json::from_str(&artifact.payload)?;
        model.forest.validate_structure()?;
        model
            .scaler
            .ensure_finite()
            .map_err(|e| RiskError::artifact(format!("invalid scaler: {}", e)))?;
        tracing::debug!(
            path = %path.display(),
            trained_at = %model.trained_at,
            trees = model.forest.n_trees(),
            "Risk model loaded"
        );
        Ok(Self::from_model(model))
    }
}
