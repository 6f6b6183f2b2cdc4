//! Command-line front end for the stress index.
//!
//! # Seed the catalog and load data
//! stress-refresh --db stress.db seed
//! stress-refresh --db stress.db import-observations --file gscpi.json
//!
//! # Score and analyze
//! stress-refresh --db stress.db latest
//! stress-refresh --db stress.db rebuild-regimes
//! stress-refresh --db stress.db context --regime crisis
//!
//! # Browse stored data
//! stress-refresh --db stress.db indicators
//! stress-refresh --db stress.db observations gscpi --start 2020-01-01 --end 2020-12-31
//! stress-refresh --db stress.db series-latest gscpi
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use stress_core::{Config, MarketPrice, Observation, Regime};
use stress_store::{seed, MarketRepository, ObservationRepository, Refresher, SeedCatalog, SqliteStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stress-refresh")]
#[command(about = "Supply chain stress index scoring and regime analysis")]
#[command(version)]
struct Cli {
    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert missing series, indicator configs and market symbols
    Seed {
        /// JSON catalog to seed instead of the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Load observations from a JSON array
    ImportObservations {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Load daily market prices from a JSON array
    ImportPrices {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Composite for the latest aligned month
    Latest,

    /// Composite for every month with a full window
    History,

    /// Recompute and replace regime-conditional returns
    RebuildRegimes,

    /// Historical market context for a regime (default: current)
    Context {
        #[arg(long)]
        regime: Option<Regime>,
    },

    /// Stored regime returns, optionally filtered
    RegimeReturns {
        #[arg(long)]
        regime: Option<Regime>,

        #[arg(long)]
        theme: Option<String>,
    },

    /// Current regime with per-symbol snapshots
    Market,

    /// Recent prices for one symbol
    Prices {
        symbol: String,

        /// Look-back in days
        #[arg(long, default_value_t = 365, value_parser = clap::value_parser!(i64).range(1..=3650))]
        days: i64,
    },

    /// Indicator configs in display order
    Indicators,

    /// Tracked market symbols
    MarketSeries,

    /// Observations of one series, bounds inclusive
    Observations {
        series_id: String,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Newest observation of one series
    SeriesLatest { series_id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(db) = &cli.db {
        config.storage.db_path = db.display().to_string();
    }
    config.validate()?;

    let mut store = SqliteStore::open(&config.storage.db_path)
        .with_context(|| format!("Failed to open database at {}", config.storage.db_path))?;
    let refresher = Refresher::new(config);
    let decimals = refresher.config().presentation.score_decimals;

    match cli.command {
        Commands::Seed { catalog } => {
            let catalog = match catalog {
                Some(path) => SeedCatalog::from_json_file(&path)?,
                None => SeedCatalog::default(),
            };
            print_json(&seed(&mut store, &catalog)?)?;
        }
        Commands::ImportObservations { file } => {
            let observations: Vec<Observation> = read_json(&file)?;
            let added = store.upsert_observations(&observations)?;
            info!(received = observations.len(), added, "imported observations");
            print_json(&serde_json::json!({ "received": observations.len(), "added": added }))?;
        }
        Commands::ImportPrices { file } => {
            let prices: Vec<MarketPrice> = read_json(&file)?;
            let added = store.upsert_prices(&prices)?;
            info!(received = prices.len(), added, "imported prices");
            print_json(&serde_json::json!({ "received": prices.len(), "added": added }))?;
        }
        Commands::Latest => {
            let latest = refresher.latest_composite(&store)?;
            print_json(&latest.rounded(decimals))?;
        }
        Commands::History => {
            let rows: Vec<_> = refresher
                .composite_history(&store)?
                .iter()
                .map(|row| row.rounded(decimals))
                .collect();
            print_json(&rows)?;
        }
        Commands::RebuildRegimes => {
            let report = refresher.rebuild_regime_returns(&mut store, Utc::now())?;
            print_json(&serde_json::json!({
                "records": report.records.len(),
                "skipped": report.skipped,
            }))?;
        }
        Commands::Context { regime } => {
            let regime = match regime {
                Some(regime) => regime,
                None => refresher.current_regime(&store)?.0,
            };
            print_json(&refresher.regime_context(&store, regime)?)?;
        }
        Commands::RegimeReturns { regime, theme } => {
            print_json(&refresher.regime_returns(&store, regime, theme.as_deref())?)?;
        }
        Commands::Market => {
            print_json(&refresher.market_snapshot(&store)?)?;
        }
        Commands::Prices { symbol, days } => {
            let today = Utc::now().date_naive();
            print_json(&refresher.recent_prices(&store, &symbol, days, today)?)?;
        }
        Commands::Indicators => {
            print_json(&refresher.indicator_configs(&store)?)?;
        }
        Commands::MarketSeries => {
            print_json(&refresher.market_series(&store)?)?;
        }
        Commands::Observations { series_id, start, end } => {
            print_json(&refresher.observations(&store, &series_id, start, end)?)?;
        }
        Commands::SeriesLatest { series_id } => {
            print_json(&refresher.series_latest(&store, &series_id)?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("stress-refresh").chain(args.iter().copied()))
    }

    #[test]
    fn test_prices_days_bounds() {
        assert!(parse(&["prices", "SPY", "--days", "1000000000"]).is_err());
        assert!(parse(&["prices", "SPY", "--days", "0"]).is_err());
        assert!(parse(&["prices", "SPY", "--days", "3651"]).is_err());

        match parse(&["prices", "SPY", "--days", "3650"]).unwrap().command {
            Commands::Prices { days, .. } => assert_eq!(days, 3650),
            _ => panic!("expected prices"),
        }
        match parse(&["prices", "SPY"]).unwrap().command {
            Commands::Prices { days, .. } => assert_eq!(days, 365),
            _ => panic!("expected prices"),
        }
    }

    #[test]
    fn test_observation_bounds_parse_as_dates() {
        let cli = parse(&["observations", "gscpi", "--start", "2020-01-01"]).unwrap();
        match cli.command {
            Commands::Observations { series_id, start, end } => {
                assert_eq!(series_id, "gscpi");
                assert_eq!(start, NaiveDate::from_ymd_opt(2020, 1, 1));
                assert_eq!(end, None);
            }
            _ => panic!("expected observations"),
        }
        assert!(parse(&["observations", "gscpi", "--end", "2020-13-01"]).is_err());
    }

    #[test]
    fn test_catalog_subcommands() {
        assert!(matches!(parse(&["indicators"]).unwrap().command, Commands::Indicators));
        assert!(matches!(parse(&["market-series"]).unwrap().command, Commands::MarketSeries));
        assert!(matches!(
            parse(&["series-latest", "cass"]).unwrap().command,
            Commands::SeriesLatest { .. }
        ));
    }
}
