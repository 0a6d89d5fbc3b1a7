//! Error types for the risk assessment core

use thiserror::Error;

/// Errors surfaced by feature engineering, scoring, allocation and the
/// collaborators around them. Nothing in the core retries internally.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Risk model has not been fitted")]
    ModelNotFitted,

    #[error("Degenerate allocation: normalization denominator is {denominator}")]
    DegenerateAllocation { denominator: f64 },

    #[error("Model artifact error: {0}")]
    Artifact(String),

    #[error("Ledger gateway error: {0}")]
    Gateway(String),

    #[error("Scoring task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RiskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Input problems the caller has to fix before trying again
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
