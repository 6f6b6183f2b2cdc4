//! In-memory repository, used by tests and dry runs.

use crate::repository::{
    IndicatorConfigRepository, MarketRepository, ObservationRepository, RegimeReturnRepository,
    SeriesRepository,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use stress_core::{
    IndicatorConfig, MarketPrice, MarketSeries, Observation, RegimeReturn, Result, Series,
};

/// Repository backed by plain collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    series: BTreeMap<String, Series>,
    configs: BTreeMap<String, IndicatorConfig>,
    observations: HashMap<String, BTreeMap<NaiveDate, Observation>>,
    market_series: BTreeMap<String, MarketSeries>,
    prices: HashMap<String, BTreeMap<NaiveDate, MarketPrice>>,
    regime_returns: Vec<RegimeReturn>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeriesRepository for MemoryStore {
    fn series(&self) -> Result<Vec<Series>> {
        Ok(self.series.values().cloned().collect())
    }

    fn insert_series(&mut self, series: &Series) -> Result<bool> {
        if self.series.contains_key(&series.id) {
            return Ok(false);
        }
        self.series.insert(series.id.clone(), series.clone());
        Ok(true)
    }
}

impl ObservationRepository for MemoryStore {
    fn fetch_observations(&self, series_id: &str) -> Result<Vec<Observation>> {
        Ok(self
            .observations
            .get(series_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_observations(&mut self, observations: &[Observation]) -> Result<usize> {
        let mut added = 0;
        for obs in observations {
            let rows = self.observations.entry(obs.series_id.clone()).or_default();
            if !rows.contains_key(&obs.date) {
                rows.insert(obs.date, obs.clone());
                added += 1;
            }
        }
        Ok(added)
    }
}

impl IndicatorConfigRepository for MemoryStore {
    fn indicator_configs(&self) -> Result<Vec<IndicatorConfig>> {
        let mut configs: Vec<IndicatorConfig> = self.configs.values().cloned().collect();
        configs.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.series_id.cmp(&b.series_id))
        });
        Ok(configs)
    }

    fn insert_indicator_config(&mut self, config: &IndicatorConfig) -> Result<bool> {
        if self.configs.contains_key(&config.series_id) {
            return Ok(false);
        }
        self.configs.insert(config.series_id.clone(), config.clone());
        Ok(true)
    }
}

impl MarketRepository for MemoryStore {
    fn market_series(&self) -> Result<Vec<MarketSeries>> {
        let mut series: Vec<MarketSeries> = self.market_series.values().cloned().collect();
        series.sort_by(|a, b| {
            a.series_type
                .as_str()
                .cmp(b.series_type.as_str())
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        Ok(series)
    }

    fn insert_market_series(&mut self, series: &MarketSeries) -> Result<bool> {
        if self.market_series.contains_key(&series.symbol) {
            return Ok(false);
        }
        self.market_series
            .insert(series.symbol.clone(), series.clone());
        Ok(true)
    }

    fn fetch_prices(&self, symbol: &str) -> Result<Vec<MarketPrice>> {
        Ok(self
            .prices
            .get(symbol)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert_prices(&mut self, prices: &[MarketPrice]) -> Result<usize> {
        let mut added = 0;
        for price in prices {
            let rows = self.prices.entry(price.symbol.clone()).or_default();
            if !rows.contains_key(&price.date) {
                rows.insert(price.date, price.clone());
                added += 1;
            }
        }
        Ok(added)
    }
}

impl RegimeReturnRepository for MemoryStore {
    fn regime_returns(&self) -> Result<Vec<RegimeReturn>> {
        Ok(self.regime_returns.clone())
    }

    fn replace_regime_returns(&mut self, records: &[RegimeReturn]) -> Result<usize> {
        self.regime_returns = records.to_vec();
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stress_core::SeriesType;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_observations_are_additive() {
        let mut store = MemoryStore::new();
        let added = store
            .upsert_observations(&[
                Observation::new("gscpi", date(2), 1.0),
                Observation::new("gscpi", date(1), 0.5),
            ])
            .unwrap();
        assert_eq!(added, 2);

        // Same date again: the stored value is kept.
        let added = store
            .upsert_observations(&[
                Observation::new("gscpi", date(1), 99.0),
                Observation::new("gscpi", date(3), 2.0),
            ])
            .unwrap();
        assert_eq!(added, 1);

        let rows = store.fetch_observations("gscpi").unwrap();
        let values: Vec<f64> = rows.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![0.5, 1.0, 2.0]);
        assert!(store.fetch_observations("missing").unwrap().is_empty());
    }

    #[test]
    fn test_config_ordering_and_active_filter() {
        let mut store = MemoryStore::new();
        store
            .insert_indicator_config(&IndicatorConfig::new("b", 2))
            .unwrap();
        store
            .insert_indicator_config(&IndicatorConfig::new("a", 2).excluded())
            .unwrap();
        store
            .insert_indicator_config(&IndicatorConfig::new("c", 1))
            .unwrap();
        assert!(!store
            .insert_indicator_config(&IndicatorConfig::new("c", 9))
            .unwrap());

        let ids: Vec<String> = store
            .indicator_configs()
            .unwrap()
            .into_iter()
            .map(|c| c.series_id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let active: Vec<String> = store
            .active_indicator_configs()
            .unwrap()
            .into_iter()
            .map(|c| c.series_id)
            .collect();
        assert_eq!(active, vec!["c", "b"]);
    }

    #[test]
    fn test_market_series_ordered_by_type_then_symbol() {
        let mut store = MemoryStore::new();
        for (symbol, series_type) in [
            ("SPY", SeriesType::Index),
            ("NVDA", SeriesType::Stock),
            ("XLK", SeriesType::Etf),
            ("AMZN", SeriesType::Stock),
        ] {
            store
                .insert_market_series(&MarketSeries {
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    series_type,
                    theme: None,
                })
                .unwrap();
        }

        let symbols: Vec<String> = store
            .market_series()
            .unwrap()
            .into_iter()
            .map(|s| s.symbol)
            .collect();
        assert_eq!(symbols, vec!["XLK", "SPY", "AMZN", "NVDA"]);
    }
}
