//! Core data types for the stress index system.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Round a value to a fixed number of decimal places.
///
/// Only used at the result boundary, never inside rolling computations.
#[inline]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Calendar month used as the alignment unit (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
}

impl MonthKey {
    /// Create a month key, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month a date falls in.
    #[inline]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month after this one.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| Error::data(format!("invalid month key: {s:?}")))?;
        let year: i32 = year
            .parse()
            .map_err(|_| Error::data(format!("invalid year in month key: {s:?}")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| Error::data(format!("invalid month in month key: {s:?}")))?;
        MonthKey::new(year, month).ok_or_else(|| Error::data(format!("month out of range: {s:?}")))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Qualitative stress regime, ordered from calm to crisis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Low,
    Normal,
    Elevated,
    Crisis,
}

impl Regime {
    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Low => "low",
            Regime::Normal => "normal",
            Regime::Elevated => "elevated",
            Regime::Crisis => "crisis",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Regime::Low),
            "normal" => Ok(Regime::Normal),
            "elevated" => Ok(Regime::Elevated),
            "crisis" => Ok(Regime::Crisis),
            other => Err(Error::data(format!("unknown regime: {other:?}"))),
        }
    }
}

/// Metadata for an indicator series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Identifier (e.g., "gscpi").
    pub id: String,
    pub name: String,
    /// Publication cadence ("monthly", "daily", ...).
    pub frequency: String,
    pub source: Option<String>,
    pub url: Option<String>,
}

/// One dated sample of an indicator series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub series_id: String,
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(series_id: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        Self {
            series_id: series_id.into(),
            date,
            value,
        }
    }
}

/// How a series takes part in the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Primary key.
    pub series_id: String,
    pub include_in_composite: bool,
    /// Non-negative weight.
    pub weight: f64,
    /// Negate the z-score (for series where high values mean less stress).
    pub invert_sign: bool,
    pub display_order: i32,
}

impl IndicatorConfig {
    /// An included, unit-weight, non-inverted indicator.
    pub fn new(series_id: impl Into<String>, display_order: i32) -> Self {
        Self {
            series_id: series_id.into(),
            include_in_composite: true,
            weight: 1.0,
            invert_sign: false,
            display_order,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert_sign = true;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.include_in_composite = false;
        self
    }
}

/// Market instrument category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    Index,
    Etf,
    Stock,
}

impl SeriesType {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesType::Index => "index",
            SeriesType::Etf => "etf",
            SeriesType::Stock => "stock",
        }
    }
}

impl FromStr for SeriesType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(SeriesType::Index),
            "etf" => Ok(SeriesType::Etf),
            "stock" => Ok(SeriesType::Stock),
            other => Err(Error::data(format!("unknown series type: {other:?}"))),
        }
    }
}

/// Metadata for a stock, ETF or index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSeries {
    pub symbol: String,
    pub name: String,
    pub series_type: SeriesType,
    /// Grouping tag ("chips", "retail", ...).
    pub theme: Option<String>,
}

/// Daily price for a market symbol. Unique per (symbol, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub adjusted_close: f64,
    pub volume: Option<i64>,
}

/// Per-indicator output for one month. Always recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub series_id: String,
    /// Date of the observation representing the month.
    pub date: NaiveDate,
    /// Raw value.
    pub value: f64,
    /// Z-score after sign inversion.
    pub z_score: f64,
    pub regime: Regime,
    pub weight: f64,
}

/// Composite score and its regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub score: f64,
    pub regime: Regime,
}

/// Bookkeeping attached to a composite result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeMeta {
    pub window: usize,
    pub aligned_months: usize,
    pub indicator_count: usize,
}

/// Latest composite reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub month: MonthKey,
    /// Indicator results in display order.
    ///
    /// Serialized as an object keyed by series id, entries in display order.
    #[serde(with = "indicators_by_id")]
    pub indicators: Vec<IndicatorResult>,
    pub composite: CompositeScore,
    pub meta: CompositeMeta,
}

impl CompositeResult {
    /// Look up an indicator result by series id.
    pub fn indicator(&self, series_id: &str) -> Option<&IndicatorResult> {
        self.indicators.iter().find(|r| r.series_id == series_id)
    }

    /// Copy with z-scores and the composite score rounded for presentation.
    ///
    /// Regimes are kept as classified from the unrounded values.
    pub fn rounded(&self, places: u32) -> Self {
        let mut out = self.clone();
        for r in &mut out.indicators {
            r.z_score = round_to(r.z_score, places);
        }
        out.composite.score = round_to(out.composite.score, places);
        out
    }
}

mod indicators_by_id {
    use super::{IndicatorResult, Regime};
    use chrono::NaiveDate;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    #[derive(Serialize)]
    struct EntryRef<'a> {
        date: &'a NaiveDate,
        value: f64,
        z_score: f64,
        regime: Regime,
        weight: f64,
    }

    #[derive(Deserialize)]
    struct Entry {
        date: NaiveDate,
        value: f64,
        z_score: f64,
        regime: Regime,
        weight: f64,
    }

    pub fn serialize<S: Serializer>(
        indicators: &[IndicatorResult],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(indicators.len()))?;
        for r in indicators {
            let entry = EntryRef {
                date: &r.date,
                value: r.value,
                z_score: r.z_score,
                regime: r.regime,
                weight: r.weight,
            };
            map.serialize_entry(&r.series_id, &entry)?;
        }
        map.end()
    }

    struct IndicatorsVisitor;

    impl<'de> Visitor<'de> for IndicatorsVisitor {
        type Value = Vec<IndicatorResult>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of indicator results keyed by series id")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((series_id, e)) = access.next_entry::<String, Entry>()? {
                out.push(IndicatorResult {
                    series_id,
                    date: e.date,
                    value: e.value,
                    z_score: e.z_score,
                    regime: e.regime,
                    weight: e.weight,
                });
            }
            Ok(out)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<IndicatorResult>, D::Error> {
        deserializer.deserialize_map(IndicatorsVisitor)
    }
}

/// One month of the rolling composite history.
///
/// Serializes flattened as `{"month", "<series_id>_z"..., "composite", "regime"}`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub month: MonthKey,
    /// (series id, z-score) in display order.
    pub z_scores: Vec<(String, f64)>,
    pub composite: f64,
    pub regime: Regime,
}

impl HistoryRow {
    /// Z-score of one indicator in this row.
    pub fn z_score(&self, series_id: &str) -> Option<f64> {
        self.z_scores
            .iter()
            .find(|(id, _)| id == series_id)
            .map(|(_, z)| *z)
    }

    pub fn rounded(&self, places: u32) -> Self {
        Self {
            month: self.month,
            z_scores: self
                .z_scores
                .iter()
                .map(|(id, z)| (id.clone(), round_to(*z, places)))
                .collect(),
            composite: round_to(self.composite, places),
            regime: self.regime,
        }
    }
}

impl Serialize for HistoryRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.z_scores.len() + 3))?;
        map.serialize_entry("month", &self.month)?;
        for (id, z) in &self.z_scores {
            map.serialize_entry(&format!("{id}_z"), z)?;
        }
        map.serialize_entry("composite", &self.composite)?;
        map.serialize_entry("regime", &self.regime)?;
        map.end()
    }
}

/// Regime-conditional monthly return statistics for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReturn {
    pub symbol: String,
    pub regime: Regime,
    pub avg_monthly_return: f64,
    /// Population standard deviation; 0.0 for a single sample.
    pub std_monthly_return: f64,
    pub sample_count: usize,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_key_format_and_parse() {
        let key = MonthKey::from_date(date(2024, 3, 17));
        assert_eq!(key.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<MonthKey>().unwrap(), key);
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("202403".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_month_key_ordering_and_steps() {
        let dec = MonthKey::new(2023, 12).unwrap();
        let jan = MonthKey::new(2024, 1).unwrap();
        assert!(dec < jan);
        assert_eq!(dec.next(), jan);
        assert_eq!(jan.next(), MonthKey::new(2024, 2).unwrap());
    }

    #[test]
    fn test_month_key_serde() {
        let key = MonthKey::new(2021, 7).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2021-07\"");
        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_regime_order_and_labels() {
        assert!(Regime::Low < Regime::Normal);
        assert!(Regime::Elevated < Regime::Crisis);
        assert_eq!(Regime::Elevated.to_string(), "elevated");
        assert_eq!("crisis".parse::<Regime>().unwrap(), Regime::Crisis);
        assert!("calm".parse::<Regime>().is_err());
        assert_eq!(serde_json::to_string(&Regime::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(-0.0004, 3), -0.0);
        assert_eq!(round_to(12.345, 0), 12.0);
    }

    #[test]
    fn test_history_row_flattened_json() {
        let row = HistoryRow {
            month: MonthKey::new(2024, 5).unwrap(),
            z_scores: vec![("gscpi".to_string(), 1.23456), ("cass".to_string(), -0.5)],
            composite: 0.36728,
            regime: Regime::Normal,
        };
        let value = serde_json::to_value(row.rounded(3)).unwrap();
        assert_eq!(value["month"], "2024-05");
        assert_eq!(value["gscpi_z"], 1.235);
        assert_eq!(value["cass_z"], -0.5);
        assert_eq!(value["composite"], 0.367);
        assert_eq!(value["regime"], "normal");
    }

    #[test]
    fn test_composite_indicators_keyed_by_series_id() {
        let indicator = |id: &str, z: f64| IndicatorResult {
            series_id: id.to_string(),
            date: date(2024, 5, 1),
            value: 1.5,
            z_score: z,
            regime: Regime::Normal,
            weight: 1.0,
        };
        let result = CompositeResult {
            month: MonthKey::new(2024, 5).unwrap(),
            indicators: vec![indicator("gscpi", 0.4), indicator("cass", -0.2)],
            composite: CompositeScore {
                score: 0.1,
                regime: Regime::Normal,
            },
            meta: CompositeMeta {
                window: 36,
                aligned_months: 40,
                indicator_count: 2,
            },
        };

        let json = serde_json::to_string(&result).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["indicators"].is_object());
        assert_eq!(value["indicators"]["cass"]["z_score"], -0.2);
        assert_eq!(value["indicators"]["gscpi"]["date"], "2024-05-01");
        assert!(value["indicators"]["gscpi"].get("series_id").is_none());
        // Display order survives in the text.
        assert!(json.find("\"gscpi\"").unwrap() < json.find("\"cass\"").unwrap());

        let back: CompositeResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_indicator_config_builders() {
        let config = IndicatorConfig::new("cass", 3).with_weight(2.0).inverted();
        assert!(config.include_in_composite);
        assert!(config.invert_sign);
        assert_eq!(config.weight, 2.0);
        assert!(!IndicatorConfig::new("x", 0).excluded().include_in_composite);
    }
}
