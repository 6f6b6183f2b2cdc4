//! Regime-conditional market analysis for the stress index system.
//!
//! This crate provides:
//! - Month-over-month returns from daily prices
//! - Return statistics bucketed by the active stress regime
//! - Theme and performer summaries for the current regime
//! - Per-symbol market snapshots and regime-return listings

pub mod returns;
pub mod regime_returns;
pub mod context;
pub mod market;

pub use returns::compute_monthly_returns;
pub use regime_returns::{month_regimes, RegimeReturnAnalyzer, RegimeReturnReport};
pub use context::{get_regime_context, Performer, RegimeContext, ThemePerformance};
pub use market::{filter_regime_returns, market_snapshot, RegimeReturnRow, SymbolSnapshot};
