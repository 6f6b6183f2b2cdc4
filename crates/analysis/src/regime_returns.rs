//! Regime-conditional return statistics.
//!
//! Buckets each symbol's monthly returns by the composite regime active in
//! that month and summarizes every non-empty bucket. The output is a full
//! replacement set: callers store it by clearing and repopulating, never by
//! merging into a previous result.

use crate::returns::compute_monthly_returns;
use chrono::{DateTime, Utc};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use stress_core::{Error, HistoryRow, MarketPrice, MonthKey, Regime, RegimeReturn};
use tracing::{debug, info, warn};

/// Month -> regime lookup built from a composite history.
pub fn month_regimes(history: &[HistoryRow]) -> BTreeMap<MonthKey, Regime> {
    history.iter().map(|row| (row.month, row.regime)).collect()
}

/// Result of a full regime-return rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegimeReturnReport {
    /// Records ordered by symbol, then regime.
    pub records: Vec<RegimeReturn>,
    /// Symbols skipped because they had no price rows.
    pub skipped: Vec<String>,
}

impl RegimeReturnReport {
    /// Record for one (symbol, regime) pair.
    pub fn get(&self, symbol: &str, regime: Regime) -> Option<&RegimeReturn> {
        self.records
            .iter()
            .find(|r| r.symbol == symbol && r.regime == regime)
    }
}

/// Regime-return calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegimeReturnAnalyzer;

impl RegimeReturnAnalyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Compute statistics for every symbol against a composite history.
    ///
    /// A symbol without prices is skipped; the rest of the batch proceeds.
    pub fn compute_regime_returns(
        &self,
        history: &[HistoryRow],
        prices_by_symbol: &BTreeMap<String, Vec<MarketPrice>>,
        computed_at: DateTime<Utc>,
    ) -> RegimeReturnReport {
        let regimes = month_regimes(history);
        let mut report = RegimeReturnReport::default();

        if regimes.is_empty() {
            info!("no composite history, nothing to bucket");
            return report;
        }

        for (symbol, prices) in prices_by_symbol {
            if prices.is_empty() {
                let err = Error::NoPriceData {
                    symbol: symbol.clone(),
                };
                warn!(%symbol, "{err}, skipping");
                report.skipped.push(symbol.clone());
                continue;
            }

            let records = self.symbol_regime_returns(symbol, prices, &regimes, computed_at);
            debug!(%symbol, buckets = records.len(), "bucketed monthly returns");
            report.records.extend(records);
        }

        info!(
            records = report.records.len(),
            skipped = report.skipped.len(),
            "computed regime returns"
        );
        report
    }

    /// Statistics for one symbol, one record per regime with at least one sample.
    pub fn symbol_regime_returns(
        &self,
        symbol: &str,
        prices: &[MarketPrice],
        regimes: &BTreeMap<MonthKey, Regime>,
        computed_at: DateTime<Utc>,
    ) -> Vec<RegimeReturn> {
        let returns = compute_monthly_returns(prices.iter().map(|p| (p.date, p.adjusted_close)));

        let mut buckets: BTreeMap<Regime, Vec<f64>> = BTreeMap::new();
        for (month, ret) in returns {
            if let Some(&regime) = regimes.get(&month) {
                buckets.entry(regime).or_default().push(ret);
            }
        }

        buckets
            .into_iter()
            .map(|(regime, rets)| {
                let sample_count = rets.len();
                let avg = rets.iter().mean();
                let std = if sample_count > 1 {
                    rets.iter().population_std_dev()
                } else {
                    0.0
                };
                RegimeReturn {
                    symbol: symbol.to_string(),
                    regime,
                    avg_monthly_return: avg,
                    std_monthly_return: std,
                    sample_count,
                    computed_at,
                }
            })
            .collect()
    }
}
