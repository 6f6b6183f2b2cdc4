//! Catalog seeding.
//!
//! Seeding only adds rows whose key is missing, so it can run on every
//! start without clobbering edited weights or names.

use crate::repository::Repository;
use serde::{Deserialize, Serialize};
use std::path::Path;
use stress_core::{IndicatorConfig, MarketSeries, Result, Series, SeriesType};
use tracing::info;

/// Series, composite configs and market symbols to seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedCatalog {
    pub series: Vec<Series>,
    pub indicator_configs: Vec<IndicatorConfig>,
    pub market_series: Vec<MarketSeries>,
}

/// Number of rows each seeding step added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub series: usize,
    pub indicator_configs: usize,
    pub market_series: usize,
}

impl SeedCatalog {
    /// Load a catalog from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

fn series(id: &str, name: &str, frequency: &str, source: &str, url: &str) -> Series {
    Series {
        id: id.to_string(),
        name: name.to_string(),
        frequency: frequency.to_string(),
        source: Some(source.to_string()),
        url: Some(url.to_string()),
    }
}

fn market(symbol: &str, name: &str, series_type: SeriesType, theme: Option<&str>) -> MarketSeries {
    MarketSeries {
        symbol: symbol.to_string(),
        name: name.to_string(),
        series_type,
        theme: theme.map(str::to_string),
    }
}

impl Default for SeedCatalog {
    /// The supply-chain catalog: nine indicator series, seven of them in the
    /// composite, and eleven tracked market symbols.
    fn default() -> Self {
        let series = vec![
            series(
                "gscpi",
                "Global Supply Chain Pressure Index (NY Fed)",
                "monthly",
                "New York Fed",
                "https://www.newyorkfed.org/research/policy/gscpi",
            ),
            series(
                "gscsi",
                "Global Supply Chain Stress Index (World Bank)",
                "monthly",
                "World Bank",
                "https://www.worldbank.org/en/data/interactive/2025/04/08/global-supply-chain-stress-index",
            ),
            series(
                "fbx",
                "Freightos Baltic Index (FBX)",
                "daily/weekly",
                "Freightos",
                "https://terminal.freightos.com/freightos-baltic-index-global-container-pricing-index/",
            ),
            series(
                "cass",
                "Cass Freight Index (Shipments/Expenditures)",
                "monthly",
                "Cass Information Systems",
                "https://www.cassinfo.com/freight-audit-payment/cass-transportation-indexes/cass-freight-index",
            ),
            series(
                "retailirsa",
                "Retailers' Inventories-to-Sales Ratio (FRED: RETAILIRSA)",
                "monthly",
                "FRED",
                "https://fred.stlouisfed.org/series/RETAILIRSA",
            ),
            series(
                "baltic_dry",
                "Baltic Dry Index",
                "daily",
                "Baltic Exchange via Nasdaq Data Link",
                "https://data.nasdaq.com/data/LLOYDS/BDI",
            ),
            series(
                "ism_supplier",
                "ISM Supplier Deliveries Index",
                "monthly",
                "FRED",
                "https://fred.stlouisfed.org/series/ISMPMI",
            ),
            series(
                "mfg_new_orders",
                "Manufacturing New Orders",
                "monthly",
                "FRED",
                "https://fred.stlouisfed.org/series/NEWORDER",
            ),
            series(
                "wholesale_ratio",
                "Wholesale Inventories/Sales Ratio",
                "monthly",
                "FRED",
                "https://fred.stlouisfed.org/series/ISRATIO",
            ),
        ];

        let indicator_configs = [
            "gscpi",
            "retailirsa",
            "cass",
            "baltic_dry",
            "ism_supplier",
            "mfg_new_orders",
            "wholesale_ratio",
        ]
        .iter()
        .zip(1..)
        .map(|(id, order)| IndicatorConfig::new(*id, order))
        .collect();

        use SeriesType::{Etf, Index, Stock};
        let market_series = vec![
            market("SPY", "S&P 500 ETF", Index, None),
            market("XLI", "Industrial Select Sector SPDR", Etf, Some("industrials")),
            market("XLY", "Consumer Discretionary Select SPDR", Etf, Some("consumer")),
            market("XLK", "Technology Select Sector SPDR", Etf, Some("technology")),
            market("SMH", "VanEck Semiconductor ETF", Etf, Some("chips")),
            market("NVDA", "NVIDIA Corporation", Stock, Some("chips")),
            market("TSM", "Taiwan Semiconductor", Stock, Some("chips")),
            market("AVGO", "Broadcom Inc", Stock, Some("chips")),
            market("AMZN", "Amazon.com Inc", Stock, Some("logistics")),
            market("COST", "Costco Wholesale", Stock, Some("retail")),
            market("WMT", "Walmart Inc", Stock, Some("retail")),
        ];

        Self {
            series,
            indicator_configs,
            market_series,
        }
    }
}

/// Insert every catalog row whose key is not stored yet.
pub fn seed<R: Repository>(repo: &mut R, catalog: &SeedCatalog) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for s in &catalog.series {
        if repo.insert_series(s)? {
            report.series += 1;
        }
    }
    for c in &catalog.indicator_configs {
        if repo.insert_indicator_config(c)? {
            report.indicator_configs += 1;
        }
    }
    for m in &catalog.market_series {
        if repo.insert_market_series(m)? {
            report.market_series += 1;
        }
    }

    info!(
        series = report.series,
        indicator_configs = report.indicator_configs,
        market_series = report.market_series,
        "seeded catalog"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::repository::{IndicatorConfigRepository, MarketRepository, SeriesRepository};

    #[test]
    fn test_default_catalog_contents() {
        let catalog = SeedCatalog::default();
        assert_eq!(catalog.series.len(), 9);
        assert_eq!(catalog.indicator_configs.len(), 7);
        assert_eq!(catalog.market_series.len(), 11);

        assert!(catalog
            .indicator_configs
            .iter()
            .all(|c| c.weight == 1.0 && !c.invert_sign && c.include_in_composite));
        assert_eq!(catalog.indicator_configs[0].series_id, "gscpi");
        assert_eq!(catalog.indicator_configs[6].display_order, 7);

        // Every composite indicator has series metadata.
        for c in &catalog.indicator_configs {
            assert!(catalog.series.iter().any(|s| s.id == c.series_id));
        }
    }

    #[test]
    fn test_seed_only_adds_missing_rows() {
        let mut store = MemoryStore::new();
        store
            .insert_indicator_config(&IndicatorConfig::new("gscpi", 1).with_weight(3.0))
            .unwrap();

        let catalog = SeedCatalog::default();
        let first = seed(&mut store, &catalog).unwrap();
        assert_eq!(
            first,
            SeedReport {
                series: 9,
                indicator_configs: 6,
                market_series: 11
            }
        );

        let second = seed(&mut store, &catalog).unwrap();
        assert_eq!(second, SeedReport::default());

        // Edited weight survives re-seeding.
        let gscpi = store
            .indicator_configs()
            .unwrap()
            .into_iter()
            .find(|c| c.series_id == "gscpi")
            .unwrap();
        assert_eq!(gscpi.weight, 3.0);
        assert_eq!(store.series().unwrap().len(), 9);
        assert_eq!(store.market_series().unwrap().len(), 11);
    }

    #[test]
    fn test_catalog_json_round_trip_shape() {
        let json = serde_json::to_value(SeedCatalog::default()).unwrap();
        assert_eq!(json["market_series"][0]["series_type"], "index");
        assert!(json["market_series"][0]["theme"].is_null());

        let parsed: SeedCatalog = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, SeedCatalog::default());
    }
}
