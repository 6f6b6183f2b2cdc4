//! Historical market context for the active regime.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use stress_core::config::PresentationConfig;
use stress_core::{round_to, MarketSeries, Regime, RegimeReturn};

/// Theme used for symbols without one.
pub const DEFAULT_THEME: &str = "other";

/// Average performance of a theme in one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePerformance {
    pub avg_monthly_return_pct: f64,
    pub symbol_count: usize,
}

/// A symbol ranked by its average monthly return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    pub symbol: String,
    pub name: String,
    pub avg_return_pct: f64,
}

/// How the tracked market has behaved historically in a regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeContext {
    pub regime: Regime,
    pub sector_performance: BTreeMap<String, ThemePerformance>,
    pub top_performers: Vec<Performer>,
    pub bottom_performers: Vec<Performer>,
    /// Set when there is no stored history for the regime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RegimeContext {
    fn empty(regime: Regime) -> Self {
        Self {
            regime,
            sector_performance: BTreeMap::new(),
            top_performers: Vec::new(),
            bottom_performers: Vec::new(),
            message: Some("No historical data for this regime".to_string()),
        }
    }
}

/// Summarize stored regime returns for `current_regime`.
///
/// Only records whose symbol appears in `market_series` take part. Performers
/// are ranked by average return, best first; the bottom list is the tail of
/// that same ranking.
pub fn get_regime_context(
    current_regime: Regime,
    regime_returns: &[RegimeReturn],
    market_series: &[MarketSeries],
    presentation: &PresentationConfig,
) -> RegimeContext {
    let series: HashMap<&str, &MarketSeries> = market_series
        .iter()
        .map(|s| (s.symbol.as_str(), s))
        .collect();

    let matching: Vec<(&RegimeReturn, &MarketSeries)> = regime_returns
        .iter()
        .filter(|rr| rr.regime == current_regime)
        .filter_map(|rr| series.get(rr.symbol.as_str()).map(|s| (rr, *s)))
        .collect();

    if matching.is_empty() {
        return RegimeContext::empty(current_regime);
    }

    let pct = |r: f64| round_to(r * 100.0, presentation.pct_decimals);

    let mut by_theme: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (rr, ms) in &matching {
        let theme = ms.theme.as_deref().unwrap_or(DEFAULT_THEME);
        by_theme
            .entry(theme.to_string())
            .or_default()
            .push(rr.avg_monthly_return);
    }

    let sector_performance = by_theme
        .into_iter()
        .map(|(theme, rets)| {
            let perf = ThemePerformance {
                avg_monthly_return_pct: pct(rets.iter().mean()),
                symbol_count: rets.len(),
            };
            (theme, perf)
        })
        .collect();

    let mut ranked = matching;
    ranked.sort_by_key(|(rr, _)| Reverse(OrderedFloat(rr.avg_monthly_return)));

    let performer = |(rr, ms): &(&RegimeReturn, &MarketSeries)| Performer {
        symbol: ms.symbol.clone(),
        name: ms.name.clone(),
        avg_return_pct: pct(rr.avg_monthly_return),
    };
    let n = presentation.context_top_n;
    let top_performers = ranked.iter().take(n).map(performer).collect();
    let bottom_performers = ranked[ranked.len().saturating_sub(n)..]
        .iter()
        .map(performer)
        .collect();

    RegimeContext {
        regime: current_regime,
        sector_performance,
        top_performers,
        bottom_performers,
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use stress_core::SeriesType;

    fn series(symbol: &str, theme: Option<&str>) -> MarketSeries {
        MarketSeries {
            symbol: symbol.to_string(),
            name: format!("{symbol} Inc"),
            series_type: SeriesType::Stock,
            theme: theme.map(str::to_string),
        }
    }

    fn rr(symbol: &str, regime: Regime, avg: f64) -> RegimeReturn {
        RegimeReturn {
            symbol: symbol.to_string(),
            regime,
            avg_monthly_return: avg,
            std_monthly_return: 0.0,
            sample_count: 3,
            computed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn universe() -> Vec<MarketSeries> {
        vec![
            series("SPY", None),
            series("NVDA", Some("chips")),
            series("TSM", Some("chips")),
            series("COST", Some("retail")),
            series("WMT", Some("retail")),
            series("AMZN", Some("logistics")),
            series("XLI", Some("industrials")),
        ]
    }

    #[test]
    fn test_theme_averages() {
        let returns = vec![
            rr("NVDA", Regime::Elevated, 0.04),
            rr("TSM", Regime::Elevated, 0.02),
            rr("COST", Regime::Elevated, -0.01),
            rr("SPY", Regime::Elevated, 0.005),
            rr("NVDA", Regime::Low, 0.50),
        ];

        let ctx = get_regime_context(
            Regime::Elevated,
            &returns,
            &universe(),
            &PresentationConfig::default(),
        );

        assert_eq!(ctx.regime, Regime::Elevated);
        assert!(ctx.message.is_none());
        assert_eq!(ctx.sector_performance.len(), 3);
        assert_eq!(
            ctx.sector_performance["chips"],
            ThemePerformance {
                avg_monthly_return_pct: 3.0,
                symbol_count: 2
            }
        );
        assert_eq!(ctx.sector_performance["retail"].avg_monthly_return_pct, -1.0);
        assert_eq!(ctx.sector_performance[DEFAULT_THEME].avg_monthly_return_pct, 0.5);
    }

    #[test]
    fn test_top_and_bottom_performers() {
        let returns = vec![
            rr("SPY", Regime::Crisis, 0.01),
            rr("NVDA", Regime::Crisis, -0.06),
            rr("TSM", Regime::Crisis, -0.03),
            rr("COST", Regime::Crisis, 0.02),
            rr("WMT", Regime::Crisis, 0.03),
            rr("AMZN", Regime::Crisis, -0.01),
            rr("XLI", Regime::Crisis, 0.0),
        ];

        let ctx = get_regime_context(
            Regime::Crisis,
            &returns,
            &universe(),
            &PresentationConfig::default(),
        );

        let top: Vec<&str> = ctx.top_performers.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(top, vec!["WMT", "COST", "SPY", "XLI", "AMZN"]);

        let bottom: Vec<&str> = ctx.bottom_performers.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(bottom, vec!["SPY", "XLI", "AMZN", "TSM", "NVDA"]);
        assert_eq!(ctx.bottom_performers[4].avg_return_pct, -6.0);
        assert_eq!(ctx.top_performers[0].name, "WMT Inc");
    }

    #[test]
    fn test_fewer_symbols_than_top_n() {
        let returns = vec![rr("NVDA", Regime::Normal, 0.012345)];
        let ctx = get_regime_context(
            Regime::Normal,
            &returns,
            &universe(),
            &PresentationConfig::default(),
        );

        assert_eq!(ctx.top_performers.len(), 1);
        assert_eq!(ctx.bottom_performers.len(), 1);
        assert_eq!(ctx.top_performers[0].avg_return_pct, 1.23);
    }

    #[test]
    fn test_no_history_for_regime() {
        let returns = vec![rr("NVDA", Regime::Low, 0.01), rr("GHOST", Regime::Crisis, 0.01)];
        let ctx = get_regime_context(
            Regime::Crisis,
            &returns,
            &universe(),
            &PresentationConfig::default(),
        );

        assert!(ctx.sector_performance.is_empty());
        assert!(ctx.top_performers.is_empty());
        assert_eq!(
            ctx.message.as_deref(),
            Some("No historical data for this regime")
        );
    }

    #[test]
    fn test_serialized_shape() {
        let returns = vec![rr("WMT", Regime::Normal, 0.01)];
        let ctx = get_regime_context(
            Regime::Normal,
            &returns,
            &universe(),
            &PresentationConfig::default(),
        );
        let json = serde_json::to_value(&ctx).unwrap();

        assert_eq!(json["regime"], "normal");
        assert_eq!(json["sector_performance"]["retail"]["symbol_count"], 1);
        assert_eq!(json["top_performers"][0]["avg_return_pct"], 1.0);
        assert!(json.get("message").is_none());
    }
}
