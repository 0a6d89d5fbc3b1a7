//! Machine learning risk module
//!
//! Provides market risk estimation with:
//! - Feature engineering from market observations
//! - Random forest classification of adverse outcomes
//! - A scorer handle that pairs the forest with its fitted scaler and
//!   persists both as a checksummed artifact

pub mod features;
pub mod forest;
pub mod scorer;


pub use features::{FeatureConfig, FeatureEngineer, FeatureMatrix, FeatureRow, FeatureScaler};
pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use scorer::{FittedModel, LabelledSeries, RiskScorer, TrainingSample};
