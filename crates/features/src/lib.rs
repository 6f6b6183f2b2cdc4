//! Scoring for the stress index system.
//!
//! This crate handles:
//! - Rolling z-scores against a trailing window
//! - Regime classification of scores
//! - Weighted composite scoring across aligned indicators

pub mod normalizer;
pub mod classifier;
pub mod composite;

pub use normalizer::{zscore, RollingNormalizer};
pub use classifier::{classify, RegimeClassifier};
pub use composite::CompositeScorer;
