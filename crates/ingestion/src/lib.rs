//! Calendar alignment for the stress index system.
//!
//! This crate handles:
//! - Folding irregular observations into one value per month
//! - Intersecting the month sets of several series
//! - Month-end collapse of daily price series

pub mod aligner;

pub use aligner::{align, collapse_monthly, intersect, AlignedSeries, Dated, MonthlyAligner};
