//! # Portfolio Allocation Module
//!
//! Turns per-market risk scores into capital weights:
//! - Complement normalization: `(1 - r_i) / Σ(1 - r_j)`, weights sum to 1
//! - Raw risk-sum normalization: `(1 - r_i) / Σ r_j`, heuristic scoring
//!
//! ```rust,ignore
//! use betpool_risk::portfolio::{PortfolioAllocator, NormalizationMode};
//!
//! let allocator = PortfolioAllocator::new(NormalizationMode::ComplementSum);
//! let weights = allocator.allocate(&scores)?;
//! ```

mod allocator;

pub use allocator::{NormalizationMode, PortfolioAllocator};
