//! Refresh pipeline.
//!
//! Loads plain collections from a repository, hands them to the scoring and
//! analysis crates, and writes regime returns back. Nothing here computes;
//! it only wires storage to the pure functions.

use crate::repository::Repository;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use stress_analysis::{
    filter_regime_returns, get_regime_context, market_snapshot, RegimeContext,
    RegimeReturnAnalyzer, RegimeReturnReport, RegimeReturnRow, SymbolSnapshot,
};
use stress_core::{
    CompositeResult, Config, Error, HistoryRow, IndicatorConfig, MarketPrice, MarketSeries,
    Observation, Regime, Result,
};
use stress_features::CompositeScorer;
use tracing::{info, warn};

/// Current regime, per-symbol snapshots and regime context in one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub current_regime: Regime,
    /// Absent when no composite can be computed yet.
    pub composite_score: Option<f64>,
    pub symbols: Vec<SymbolSnapshot>,
    pub regime_context: RegimeContext,
}

/// Scoring and analysis over any repository.
#[derive(Debug, Clone)]
pub struct Refresher {
    config: Config,
    scorer: CompositeScorer,
    analyzer: RegimeReturnAnalyzer,
}

impl Refresher {
    pub fn new(config: Config) -> Self {
        let scorer = CompositeScorer::new(&config);
        Self {
            config,
            scorer,
            analyzer: RegimeReturnAnalyzer::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Active configs and the observations of each.
    fn load_indicators<R: Repository>(
        &self,
        repo: &R,
    ) -> Result<(Vec<IndicatorConfig>, HashMap<String, Vec<Observation>>)> {
        let configs = repo.active_indicator_configs()?;
        let mut series = HashMap::with_capacity(configs.len());
        for config in &configs {
            let observations = repo.fetch_observations(&config.series_id)?;
            series.insert(config.series_id.clone(), observations);
        }
        Ok((configs, series))
    }

    /// Prices of every tracked market symbol.
    fn load_prices<R: Repository>(&self, repo: &R) -> Result<BTreeMap<String, Vec<MarketPrice>>> {
        let mut prices = BTreeMap::new();
        for ms in repo.market_series()? {
            let rows = repo.fetch_prices(&ms.symbol)?;
            prices.insert(ms.symbol, rows);
        }
        Ok(prices)
    }

    /// Every indicator config, active or not, in display order.
    pub fn indicator_configs<R: Repository>(&self, repo: &R) -> Result<Vec<IndicatorConfig>> {
        repo.indicator_configs()
    }

    /// Tracked market symbols ordered by type, then symbol.
    pub fn market_series<R: Repository>(&self, repo: &R) -> Result<Vec<MarketSeries>> {
        repo.market_series()
    }

    /// Observations of one series between `start` and `end`, both inclusive.
    ///
    /// Either bound may be open. Rows come back in ascending date order.
    pub fn observations<R: Repository>(
        &self,
        repo: &R,
        series_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Observation>> {
        let rows = repo.fetch_observations(series_id)?;
        Ok(rows
            .into_iter()
            .filter(|o| start.map_or(true, |s| o.date >= s))
            .filter(|o| end.map_or(true, |e| o.date <= e))
            .collect())
    }

    /// Newest observation of a series.
    pub fn series_latest<R: Repository>(&self, repo: &R, series_id: &str) -> Result<Observation> {
        repo.fetch_observations(series_id)?
            .pop()
            .ok_or_else(|| Error::SeriesNotFound {
                series_id: series_id.to_string(),
            })
    }

    /// Prices of `symbol` dated within `days` days before `today`.
    pub fn recent_prices<R: Repository>(
        &self,
        repo: &R,
        symbol: &str,
        days: i64,
        today: NaiveDate,
    ) -> Result<Vec<MarketPrice>> {
        if days < 1 {
            return Err(Error::config(format!("look-back must be at least one day, got {days}")));
        }
        let start = Duration::try_days(days)
            .and_then(|span| today.checked_sub_signed(span))
            .ok_or_else(|| Error::config(format!("look-back of {days} days is out of range")))?;
        let rows = repo.fetch_prices(symbol)?;
        Ok(rows.into_iter().filter(|p| p.date >= start).collect())
    }

    /// Composite for the most recent aligned month.
    pub fn latest_composite<R: Repository>(&self, repo: &R) -> Result<CompositeResult> {
        let (configs, series) = self.load_indicators(repo)?;
        self.scorer.compute_latest(&configs, &series)
    }

    /// Composite for every month with a full window.
    pub fn composite_history<R: Repository>(&self, repo: &R) -> Result<Vec<HistoryRow>> {
        let (configs, series) = self.load_indicators(repo)?;
        self.scorer.compute_history(&configs, &series)
    }

    /// Recompute regime returns and replace the stored set.
    ///
    /// When there is not enough indicator data for a history, or no market
    /// symbols are tracked, the stored set is left untouched and an empty
    /// report comes back.
    pub fn rebuild_regime_returns<R: Repository>(
        &self,
        repo: &mut R,
        computed_at: DateTime<Utc>,
    ) -> Result<RegimeReturnReport> {
        let history = match self.composite_history(repo) {
            Ok(history) => history,
            Err(e) if e.is_insufficient_data() => {
                warn!("{e}, regime returns not rebuilt");
                return Ok(RegimeReturnReport::default());
            }
            Err(e) => return Err(e),
        };

        let prices = self.load_prices(repo)?;
        if prices.is_empty() {
            info!("no market symbols tracked, regime returns not rebuilt");
            return Ok(RegimeReturnReport::default());
        }

        let report = self
            .analyzer
            .compute_regime_returns(&history, &prices, computed_at);
        repo.replace_regime_returns(&report.records)?;
        Ok(report)
    }

    /// Historical context for `regime`.
    pub fn regime_context<R: Repository>(&self, repo: &R, regime: Regime) -> Result<RegimeContext> {
        let returns = repo.regime_returns()?;
        let series = repo.market_series()?;
        Ok(get_regime_context(
            regime,
            &returns,
            &series,
            &self.config.presentation,
        ))
    }

    /// Stored regime returns joined with market metadata.
    pub fn regime_returns<R: Repository>(
        &self,
        repo: &R,
        regime: Option<Regime>,
        theme: Option<&str>,
    ) -> Result<Vec<RegimeReturnRow>> {
        let returns = repo.regime_returns()?;
        let series = repo.market_series()?;
        Ok(filter_regime_returns(
            &returns,
            &series,
            regime,
            theme,
            self.config.presentation.pct_decimals,
        ))
    }

    /// Regime and rounded score of the latest composite.
    ///
    /// Falls back to the normal regime, without a score, while there is not
    /// enough data for a composite.
    pub fn current_regime<R: Repository>(&self, repo: &R) -> Result<(Regime, Option<f64>)> {
        match self.latest_composite(repo) {
            Ok(latest) => {
                let rounded = latest.rounded(self.config.presentation.score_decimals);
                Ok((rounded.composite.regime, Some(rounded.composite.score)))
            }
            Err(e) if e.is_insufficient_data() => {
                warn!("{e}, assuming normal regime");
                Ok((Regime::Normal, None))
            }
            Err(e) => Err(e),
        }
    }

    /// Current regime with market snapshots and context.
    pub fn market_snapshot<R: Repository>(&self, repo: &R) -> Result<MarketOverview> {
        let (current_regime, composite_score) = self.current_regime(repo)?;

        let series = repo.market_series()?;
        let prices = self.load_prices(repo)?;
        let returns = repo.regime_returns()?;

        let symbols = market_snapshot(
            current_regime,
            &series,
            &prices,
            &returns,
            self.config.presentation.pct_decimals,
        );
        let regime_context =
            get_regime_context(current_regime, &returns, &series, &self.config.presentation);

        Ok(MarketOverview {
            current_regime,
            composite_score,
            symbols,
            regime_context,
        })
    }
}
