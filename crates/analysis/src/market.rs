//! Per-symbol market views over stored prices and regime returns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use stress_core::{round_to, MarketPrice, MarketSeries, Regime, RegimeReturn, SeriesType};

/// A regime-return record joined with its market metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReturnRow {
    pub symbol: String,
    pub name: String,
    pub theme: Option<String>,
    pub regime: Regime,
    pub avg_monthly_return_pct: f64,
    pub std_monthly_return_pct: f64,
    pub sample_count: usize,
}

/// Latest state of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type")]
    pub series_type: SeriesType,
    pub theme: Option<String>,
    pub latest_date: NaiveDate,
    pub latest_price: f64,
    /// Return from the previous price row, when that price is positive.
    pub daily_return_pct: Option<f64>,
    /// Historical average monthly return in the current regime.
    pub regime_avg_return_pct: Option<f64>,
}

/// Join regime returns with market metadata, optionally filtered.
///
/// Records whose symbol is not in `market_series` are dropped.
pub fn filter_regime_returns(
    regime_returns: &[RegimeReturn],
    market_series: &[MarketSeries],
    regime: Option<Regime>,
    theme: Option<&str>,
    pct_decimals: u32,
) -> Vec<RegimeReturnRow> {
    let series: HashMap<&str, &MarketSeries> = market_series
        .iter()
        .map(|s| (s.symbol.as_str(), s))
        .collect();

    regime_returns
        .iter()
        .filter(|rr| regime.map_or(true, |r| rr.regime == r))
        .filter_map(|rr| {
            let ms = series.get(rr.symbol.as_str())?;
            if let Some(theme) = theme {
                if ms.theme.as_deref() != Some(theme) {
                    return None;
                }
            }
            Some(RegimeReturnRow {
                symbol: ms.symbol.clone(),
                name: ms.name.clone(),
                theme: ms.theme.clone(),
                regime: rr.regime,
                avg_monthly_return_pct: round_to(rr.avg_monthly_return * 100.0, pct_decimals),
                std_monthly_return_pct: round_to(rr.std_monthly_return * 100.0, pct_decimals),
                sample_count: rr.sample_count,
            })
        })
        .collect()
}

/// Latest price, last daily move and regime history for every symbol with prices.
pub fn market_snapshot(
    current_regime: Regime,
    market_series: &[MarketSeries],
    prices_by_symbol: &BTreeMap<String, Vec<MarketPrice>>,
    regime_returns: &[RegimeReturn],
    pct_decimals: u32,
) -> Vec<SymbolSnapshot> {
    let regime_avg: HashMap<&str, f64> = regime_returns
        .iter()
        .filter(|rr| rr.regime == current_regime)
        .map(|rr| (rr.symbol.as_str(), rr.avg_monthly_return))
        .collect();

    market_series
        .iter()
        .filter_map(|ms| {
            let prices = prices_by_symbol.get(&ms.symbol)?;
            let mut recent: Vec<&MarketPrice> = prices.iter().collect();
            recent.sort_by_key(|p| p.date);
            let latest = *recent.last()?;
            let daily_return = recent
                .len()
                .checked_sub(2)
                .map(|i| recent[i])
                .filter(|prev| prev.adjusted_close > 0.0)
                .map(|prev| (latest.adjusted_close - prev.adjusted_close) / prev.adjusted_close);

            Some(SymbolSnapshot {
                symbol: ms.symbol.clone(),
                name: ms.name.clone(),
                series_type: ms.series_type,
                theme: ms.theme.clone(),
                latest_date: latest.date,
                latest_price: latest.adjusted_close,
                daily_return_pct: daily_return.map(|r| round_to(r * 100.0, pct_decimals)),
                regime_avg_return_pct: regime_avg
                    .get(ms.symbol.as_str())
                    .map(|r| round_to(r * 100.0, pct_decimals)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn series(symbol: &str, theme: Option<&str>) -> MarketSeries {
        MarketSeries {
            symbol: symbol.to_string(),
            name: symbol.to_lowercase(),
            series_type: SeriesType::Etf,
            theme: theme.map(str::to_string),
        }
    }

    fn rr(symbol: &str, regime: Regime, avg: f64, std: f64) -> RegimeReturn {
        RegimeReturn {
            symbol: symbol.to_string(),
            regime,
            avg_monthly_return: avg,
            std_monthly_return: std,
            sample_count: 4,
            computed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn price(symbol: &str, d: u32, close: f64) -> MarketPrice {
        MarketPrice {
            symbol: symbol.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, d).unwrap(),
            close,
            adjusted_close: close,
            volume: Some(1_000),
        }
    }

    #[test]
    fn test_filter_by_regime_and_theme() {
        let universe = vec![series("SMH", Some("chips")), series("XLY", Some("consumer"))];
        let returns = vec![
            rr("SMH", Regime::Crisis, -0.0123, 0.05),
            rr("SMH", Regime::Low, 0.02, 0.01),
            rr("XLY", Regime::Crisis, 0.001, 0.0),
            rr("UNKNOWN", Regime::Crisis, 0.5, 0.0),
        ];

        let all = filter_regime_returns(&returns, &universe, None, None, 2);
        assert_eq!(all.len(), 3);

        let crisis = filter_regime_returns(&returns, &universe, Some(Regime::Crisis), None, 2);
        assert_eq!(crisis.len(), 2);

        let chips_crisis =
            filter_regime_returns(&returns, &universe, Some(Regime::Crisis), Some("chips"), 2);
        assert_eq!(chips_crisis.len(), 1);
        assert_eq!(chips_crisis[0].avg_monthly_return_pct, -1.23);
        assert_eq!(chips_crisis[0].std_monthly_return_pct, 5.0);
        assert_eq!(chips_crisis[0].sample_count, 4);
    }

    #[test]
    fn test_snapshot_latest_and_daily_return() {
        let universe = vec![series("SPY", None), series("XLK", Some("technology"))];
        let prices = BTreeMap::from([(
            "SPY".to_string(),
            vec![price("SPY", 14, 200.0), price("SPY", 12, 150.0), price("SPY", 13, 100.0)],
        )]);
        let returns = vec![rr("SPY", Regime::Normal, 0.0125, 0.0), rr("SPY", Regime::Low, 0.5, 0.0)];

        let snapshot = market_snapshot(Regime::Normal, &universe, &prices, &returns, 2);

        assert_eq!(snapshot.len(), 1);
        let spy = &snapshot[0];
        assert_eq!(spy.latest_date, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
        assert_eq!(spy.latest_price, 200.0);
        assert_eq!(spy.daily_return_pct, Some(100.0));
        assert_eq!(spy.regime_avg_return_pct, Some(1.25));
    }

    #[test]
    fn test_snapshot_edge_cases() {
        let universe = vec![series("A", None), series("B", None)];
        let prices = BTreeMap::from([
            ("A".to_string(), vec![price("A", 3, 10.0)]),
            ("B".to_string(), vec![price("B", 3, 0.0), price("B", 4, 10.0)]),
        ]);

        let snapshot = market_snapshot(Regime::Crisis, &universe, &prices, &[], 2);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].daily_return_pct, None);
        assert_eq!(snapshot[1].daily_return_pct, None);
        assert_eq!(snapshot[1].regime_avg_return_pct, None);

        let json = serde_json::to_value(&snapshot[0]).unwrap();
        assert_eq!(json["type"], "etf");
        assert_eq!(json["latest_date"], "2024-06-03");
    }
}
