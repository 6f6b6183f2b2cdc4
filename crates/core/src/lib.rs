//! Core types and configuration for the stress index system.
//!
//! This crate provides shared types used across all other crates:
//! - Series, observations and market prices
//! - Composite and regime-return result types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, WeightPolicy, MIN_SIGMA, WINDOW};
pub use error::{Error, Result};
pub use types::*;
