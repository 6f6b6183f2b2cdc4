//! Repository interfaces.
//!
//! The scoring and analysis crates never touch storage; they receive the
//! plain collections these traits return. Writes are additive except for
//! regime returns, which are always replaced wholesale.

use stress_core::{
    IndicatorConfig, MarketPrice, MarketSeries, Observation, RegimeReturn, Result, Series,
};

/// Indicator series metadata.
pub trait SeriesRepository {
    /// All series, ordered by id.
    fn series(&self) -> Result<Vec<Series>>;

    /// Insert a series unless one with the same id exists. Returns whether it was added.
    fn insert_series(&mut self, series: &Series) -> Result<bool>;
}

/// Indicator observations.
pub trait ObservationRepository {
    /// Observations of one series, ordered by date.
    fn fetch_observations(&self, series_id: &str) -> Result<Vec<Observation>>;

    /// Insert observations whose (series, date) is not stored yet.
    ///
    /// Existing observations are never modified. Returns the number added.
    fn upsert_observations(&mut self, observations: &[Observation]) -> Result<usize>;
}

/// Composite participation settings.
pub trait IndicatorConfigRepository {
    /// All configs, ordered by display order then series id.
    fn indicator_configs(&self) -> Result<Vec<IndicatorConfig>>;

    /// Configs included in the composite, in display order.
    fn active_indicator_configs(&self) -> Result<Vec<IndicatorConfig>> {
        Ok(self
            .indicator_configs()?
            .into_iter()
            .filter(|c| c.include_in_composite)
            .collect())
    }

    /// Insert a config unless one exists for the series. Returns whether it was added.
    fn insert_indicator_config(&mut self, config: &IndicatorConfig) -> Result<bool>;
}

/// Market symbols and their daily prices.
pub trait MarketRepository {
    /// All market series, ordered by type then symbol.
    fn market_series(&self) -> Result<Vec<MarketSeries>>;

    /// Insert a market series unless the symbol exists. Returns whether it was added.
    fn insert_market_series(&mut self, series: &MarketSeries) -> Result<bool>;

    /// Prices of one symbol, ordered by date.
    fn fetch_prices(&self, symbol: &str) -> Result<Vec<MarketPrice>>;

    /// Insert prices whose (symbol, date) is not stored yet. Returns the number added.
    fn upsert_prices(&mut self, prices: &[MarketPrice]) -> Result<usize>;
}

/// Regime-conditional return statistics.
pub trait RegimeReturnRepository {
    /// All stored records.
    fn regime_returns(&self) -> Result<Vec<RegimeReturn>>;

    /// Atomically replace every stored record with `records`.
    ///
    /// Readers never observe a partially cleared table.
    fn replace_regime_returns(&mut self, records: &[RegimeReturn]) -> Result<usize>;
}

/// Everything the refresh pipeline needs.
pub trait Repository:
    SeriesRepository
    + ObservationRepository
    + IndicatorConfigRepository
    + MarketRepository
    + RegimeReturnRepository
{
}

impl<T> Repository for T where
    T: SeriesRepository
        + ObservationRepository
        + IndicatorConfigRepository
        + MarketRepository
        + RegimeReturnRepository
{
}
