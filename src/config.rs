//! Configuration loading
//!
//! Layers an optional TOML file with `BETPOOL__`-prefixed environment
//! variables (e.g. `BETPOOL__FEATURES__ROLLING_WINDOW=20`). Every section has
//! defaults, so an empty or missing file yields a working configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, RiskError};
use crate::ml::ForestParams;
use crate::portfolio::NormalizationMode;
use crate::strategy::{default_yield_rules, YieldRule};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub yield_rules: YieldConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("BETPOOL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        tracing::debug!(
            window = config.features.rolling_window,
            rules = config.yield_rules.rules.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.rolling_window < 2 {
            return Err(RiskError::validation(format!(
                "rolling_window must be at least 2, got {}",
                self.features.rolling_window
            )));
        }
        if self.model.n_trees == 0 {
            return Err(RiskError::validation("model.n_trees must be positive"));
        }
        for rule in &self.yield_rules.rules {
            if rule.estimated_apy <= Decimal::ZERO {
                return Err(RiskError::validation(format!(
                    "yield rule '{}' has non-positive apy {}",
                    rule.protocol_name, rule.estimated_apy
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSettings {
    /// Samples in the rolling volatility window
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    /// Drop markets without enough history instead of failing the batch
    #[serde(default)]
    pub drop_incomplete: bool,
}

fn default_rolling_window() -> usize {
    30
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            drop_incomplete: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model artifact location, `~` is expanded
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    /// 0 = unlimited
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_model_path() -> String {
    "~/.betpool/risk_model.json".to_string()
}

fn default_n_trees() -> usize {
    100
}

fn default_max_depth() -> usize {
    8
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

impl ModelConfig {
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.n_trees,
            max_depth: if self.max_depth == 0 { None } else { Some(self.max_depth) },
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            seed: self.seed,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default)]
    pub normalization: NormalizationMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldConfig {
    #[serde(default = "default_yield_rules")]
    pub rules: Vec<YieldRule>,
}

impl Default for YieldConfig {
    fn default() -> Self {
        Self {
            rules: default_yield_rules(),
        }
    }
}
