//! Yield strategy screening
//!
//! Maps aggregate pool state to candidate external yield strategies
//! (lending, staking) through a configurable rule table.

pub mod yield_rules;

#[cfg(test)]
mod yield_tests;

pub use yield_rules::{default_yield_rules, YieldOpportunityGenerator, YieldRule};
