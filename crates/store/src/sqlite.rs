//! SQLite-backed repository.
//!
//! Dates are stored as ISO-8601 text. Observations and prices are unique per
//! (key, date) and inserted with `INSERT OR IGNORE`; regime returns are
//! rewritten inside a single transaction.

use crate::repository::{
    IndicatorConfigRepository, MarketRepository, ObservationRepository, RegimeReturnRepository,
    SeriesRepository,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::str::FromStr;
use stress_core::{
    Error, IndicatorConfig, MarketPrice, MarketSeries, Observation, RegimeReturn, Result, Series,
};
use tracing::{debug, info, warn};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS series (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    frequency TEXT NOT NULL,
    source TEXT,
    url TEXT
);

CREATE TABLE IF NOT EXISTS indicator_configs (
    series_id TEXT PRIMARY KEY,
    include_in_composite INTEGER NOT NULL DEFAULT 1,
    weight REAL NOT NULL DEFAULT 1.0,
    invert_sign INTEGER NOT NULL DEFAULT 0,
    display_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS observations (
    series_id TEXT NOT NULL,
    date TEXT NOT NULL,
    value REAL NOT NULL,
    UNIQUE (series_id, date)
);

CREATE INDEX IF NOT EXISTS idx_observations_series_date
    ON observations(series_id, date);

CREATE TABLE IF NOT EXISTS market_series (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    series_type TEXT NOT NULL,
    theme TEXT
);

CREATE TABLE IF NOT EXISTS market_prices (
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    close REAL NOT NULL,
    adjusted_close REAL NOT NULL,
    volume INTEGER,
    UNIQUE (symbol, date)
);

CREATE INDEX IF NOT EXISTS idx_market_prices_symbol_date
    ON market_prices(symbol, date);

CREATE TABLE IF NOT EXISTS regime_returns (
    symbol TEXT NOT NULL,
    regime TEXT NOT NULL,
    avg_monthly_return REAL NOT NULL,
    std_monthly_return REAL NOT NULL,
    sample_count INTEGER NOT NULL,
    computed_at TEXT NOT NULL,
    PRIMARY KEY (symbol, regime)
);
"#;

fn db_err(err: rusqlite::Error) -> Error {
    Error::database(err.to_string())
}

/// Read a text column through the domain type's `FromStr`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = Error>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: Error| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Repository stored in a SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(db_err)?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(db_err)?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            warn!(%journal_mode, "WAL mode not active");
        }

        let store = Self::init(conn)?;
        info!(path = %path.display(), "database initialized");
        Ok(store)
    }

    /// Fresh private database, discarded on drop.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL).map_err(db_err)?;
        Ok(Self { conn })
    }
}

impl SeriesRepository for SqliteStore {
    fn series(&self) -> Result<Vec<Series>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, frequency, source, url FROM series ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Series {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    frequency: row.get(2)?,
                    source: row.get(3)?,
                    url: row.get(4)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn insert_series(&mut self, series: &Series) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO series (id, name, frequency, source, url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    series.id,
                    series.name,
                    series.frequency,
                    series.source,
                    series.url
                ],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }
}

impl ObservationRepository for SqliteStore {
    fn fetch_observations(&self, series_id: &str) -> Result<Vec<Observation>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT series_id, date, value FROM observations
                 WHERE series_id = ?1 ORDER BY date",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![series_id], |row| {
                Ok(Observation {
                    series_id: row.get(0)?,
                    date: row.get(1)?,
                    value: row.get(2)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn upsert_observations(&mut self, observations: &[Observation]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(db_err)?;
        let mut added = 0;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO observations (series_id, date, value)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(db_err)?;
            for obs in observations {
                added += stmt
                    .execute(params![obs.series_id, obs.date, obs.value])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!(received = observations.len(), added, "stored observations");
        Ok(added)
    }
}

impl IndicatorConfigRepository for SqliteStore {
    fn indicator_configs(&self) -> Result<Vec<IndicatorConfig>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT series_id, include_in_composite, weight, invert_sign, display_order
                 FROM indicator_configs ORDER BY display_order, series_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(IndicatorConfig {
                    series_id: row.get(0)?,
                    include_in_composite: row.get(1)?,
                    weight: row.get(2)?,
                    invert_sign: row.get(3)?,
                    display_order: row.get(4)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn insert_indicator_config(&mut self, config: &IndicatorConfig) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO indicator_configs
                 (series_id, include_in_composite, weight, invert_sign, display_order)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    config.series_id,
                    config.include_in_composite,
                    config.weight,
                    config.invert_sign,
                    config.display_order
                ],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }
}

impl MarketRepository for SqliteStore {
    fn market_series(&self) -> Result<Vec<MarketSeries>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT symbol, name, series_type, theme FROM market_series
                 ORDER BY series_type, symbol",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MarketSeries {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    series_type: parse_column(row, 2)?,
                    theme: row.get(3)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn insert_market_series(&mut self, series: &MarketSeries) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO market_series (symbol, name, series_type, theme)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    series.symbol,
                    series.name,
                    series.series_type.as_str(),
                    series.theme
                ],
            )
            .map_err(db_err)?;
        Ok(changed > 0)
    }

    fn fetch_prices(&self, symbol: &str) -> Result<Vec<MarketPrice>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT symbol, date, close, adjusted_close, volume FROM market_prices
                 WHERE symbol = ?1 ORDER BY date",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![symbol], |row| {
                Ok(MarketPrice {
                    symbol: row.get(0)?,
                    date: row.get(1)?,
                    close: row.get(2)?,
                    adjusted_close: row.get(3)?,
                    volume: row.get(4)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn upsert_prices(&mut self, prices: &[MarketPrice]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(db_err)?;
        let mut added = 0;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO market_prices
                     (symbol, date, close, adjusted_close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(db_err)?;
            for p in prices {
                added += stmt
                    .execute(params![p.symbol, p.date, p.close, p.adjusted_close, p.volume])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!(received = prices.len(), added, "stored market prices");
        Ok(added)
    }
}

impl RegimeReturnRepository for SqliteStore {
    fn regime_returns(&self) -> Result<Vec<RegimeReturn>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT symbol, regime, avg_monthly_return, std_monthly_return,
                        sample_count, computed_at
                 FROM regime_returns ORDER BY symbol, regime",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                let sample_count: i64 = row.get(4)?;
                Ok(RegimeReturn {
                    symbol: row.get(0)?,
                    regime: parse_column(row, 1)?,
                    avg_monthly_return: row.get(2)?,
                    std_monthly_return: row.get(3)?,
                    sample_count: sample_count as usize,
                    computed_at: row.get(5)?,
                })
            })
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn replace_regime_returns(&mut self, records: &[RegimeReturn]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(db_err)?;
        let removed = tx
            .execute("DELETE FROM regime_returns", [])
            .map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO regime_returns
                     (symbol, regime, avg_monthly_return, std_monthly_return,
                      sample_count, computed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;
            for rr in records {
                stmt.execute(params![
                    rr.symbol,
                    rr.regime.as_str(),
                    rr.avg_monthly_return,
                    rr.std_monthly_return,
                    rr.sample_count as i64,
                    rr.computed_at
                ])
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        info!(removed, inserted = records.len(), "replaced regime returns");
        Ok(records.len())
    }
}
