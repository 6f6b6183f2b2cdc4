//! Monthly alignment of irregularly sampled series.
//!
//! Each series is reduced to one representative sample per calendar month:
//! the sample with the latest date in that month. When two samples share the
//! exact same date, the one added last wins.

use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use stress_core::{MarketPrice, MonthKey, Observation};
use tracing::trace;

/// Anything that carries a calendar date.
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Dated for Observation {
    #[inline]
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for MarketPrice {
    #[inline]
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for (NaiveDate, f64) {
    #[inline]
    fn date(&self) -> NaiveDate {
        self.0
    }
}

/// A series keyed by month, one sample per month.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries<T = Observation> {
    months: BTreeMap<MonthKey, T>,
}

impl<T> AlignedSeries<T> {
    /// Sample for a month.
    pub fn get(&self, month: &MonthKey) -> Option<&T> {
        self.months.get(month)
    }

    /// Months in ascending order.
    pub fn months(&self) -> impl Iterator<Item = &MonthKey> + '_ {
        self.months.keys()
    }

    /// (month, sample) pairs in ascending month order.
    pub fn iter(&self) -> impl Iterator<Item = (&MonthKey, &T)> + '_ {
        self.months.iter()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Underlying month map.
    pub fn into_inner(self) -> BTreeMap<MonthKey, T> {
        self.months
    }
}

impl<T> Default for AlignedSeries<T> {
    fn default() -> Self {
        Self {
            months: BTreeMap::new(),
        }
    }
}

/// Incremental builder for an [`AlignedSeries`].
///
/// The fold keeps, per month, the sample whose date is greater than or equal
/// to the current one. The result is therefore independent of input order
/// except among samples with identical dates.
pub struct MonthlyAligner<T> {
    months: BTreeMap<MonthKey, T>,
    /// Samples seen, including replaced ones.
    seen: usize,
}

impl<T: Dated> MonthlyAligner<T> {
    /// Create an empty aligner.
    pub fn new() -> Self {
        Self {
            months: BTreeMap::new(),
            seen: 0,
        }
    }

    /// Add one sample.
    pub fn add(&mut self, item: T) {
        self.seen += 1;
        let key = MonthKey::from_date(item.date());
        match self.months.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => {
                if item.date() >= slot.get().date() {
                    slot.insert(item);
                }
            }
        }
    }

    /// Add several samples in order.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.add(item);
        }
    }

    /// Number of samples folded so far.
    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Number of distinct months so far.
    pub fn month_count(&self) -> usize {
        self.months.len()
    }

    /// Finish and return the aligned series.
    pub fn finish(self) -> AlignedSeries<T> {
        trace!(
            samples = self.seen,
            months = self.months.len(),
            "aligned series"
        );
        AlignedSeries {
            months: self.months,
        }
    }
}

impl<T: Dated> Default for MonthlyAligner<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce a sequence of dated samples to one sample per month.
pub fn align<T, I>(items: I) -> AlignedSeries<T>
where
    T: Dated,
    I: IntoIterator<Item = T>,
{
    let mut aligner = MonthlyAligner::new();
    aligner.extend(items);
    aligner.finish()
}

/// Months present in every supplied series, ascending.
///
/// An empty list yields an empty intersection.
pub fn intersect<'a, T, I>(series: I) -> Vec<MonthKey>
where
    T: 'a,
    I: IntoIterator<Item = &'a AlignedSeries<T>>,
{
    let mut iter = series.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut common: BTreeSet<MonthKey> = first.months.keys().copied().collect();
    for other in iter {
        common.retain(|m| other.months.contains_key(m));
        if common.is_empty() {
            break;
        }
    }
    common.into_iter().collect()
}

/// Collapse a daily price series to one adjusted close per month.
pub fn collapse_monthly<I>(prices: I) -> BTreeMap<MonthKey, f64>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    align(prices)
        .into_inner()
        .into_iter()
        .map(|(month, (_, close))| (month, close))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obs(y: i32, m: u32, d: u32, value: f64) -> Observation {
        Observation::new("test", date(y, m, d), value)
    }

    fn month(y: i32, m: u32) -> MonthKey {
        MonthKey::new(y, m).unwrap()
    }

    fn monthly(start_year: i32, months: u32) -> AlignedSeries {
        let mut key = month(start_year, 1);
        let mut items = Vec::new();
        for i in 0..months {
            items.push(obs(key.year, key.month, 1, i as f64));
            key = key.next();
        }
        align(items)
    }

    #[test]
    fn test_one_value_per_month() {
        let aligned = align(vec![
            obs(2024, 1, 5, 1.0),
            obs(2024, 1, 20, 2.0),
            obs(2024, 2, 3, 3.0),
        ]);

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.get(&month(2024, 1)).unwrap().value, 2.0);
        assert_eq!(aligned.get(&month(2024, 2)).unwrap().value, 3.0);
    }

    #[test]
    fn test_later_date_wins_regardless_of_order() {
        let forward = align(vec![obs(2024, 3, 1, 10.0), obs(2024, 3, 28, 20.0)]);
        let reversed = align(vec![obs(2024, 3, 28, 20.0), obs(2024, 3, 1, 10.0)]);

        assert_eq!(forward, reversed);
        assert_eq!(forward.get(&month(2024, 3)).unwrap().value, 20.0);
    }

    #[test]
    fn test_equal_date_last_added_wins() {
        let aligned = align(vec![
            obs(2024, 6, 30, 1.0),
            obs(2024, 6, 30, 2.0),
            obs(2024, 6, 1, 3.0),
        ]);

        assert_eq!(aligned.get(&month(2024, 6)).unwrap().value, 2.0);
    }

    #[test]
    fn test_align_is_idempotent() {
        let once = align(vec![
            obs(2023, 11, 2, 1.0),
            obs(2023, 11, 15, 1.5),
            obs(2023, 12, 9, 2.0),
            obs(2024, 1, 31, 3.0),
        ]);
        let twice = align(once.iter().map(|(_, o)| o.clone()).collect::<Vec<_>>());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_aligner_counts() {
        let mut aligner = MonthlyAligner::new();
        aligner.extend(vec![obs(2024, 1, 1, 1.0), obs(2024, 1, 2, 1.0)]);
        aligner.add(obs(2024, 2, 1, 1.0));

        assert_eq!(aligner.seen(), 3);
        assert_eq!(aligner.month_count(), 2);
    }

    #[test]
    fn test_intersect_common_months() {
        let a = monthly(2020, 24); // 2020-01 .. 2021-12
        let b = align(vec![
            obs(2019, 12, 1, 0.0),
            obs(2020, 6, 1, 0.0),
            obs(2021, 12, 1, 0.0),
            obs(2022, 1, 1, 0.0),
        ]);

        assert_eq!(intersect([&a, &b]), vec![month(2020, 6), month(2021, 12)]);
    }

    #[test]
    fn test_intersect_commutative_and_associative() {
        let a = monthly(2020, 30);
        let b = monthly(2021, 30);
        let c = align(vec![
            obs(2021, 3, 1, 0.0),
            obs(2022, 1, 1, 0.0),
            obs(2023, 1, 1, 0.0),
        ]);

        let abc = intersect([&a, &b, &c]);
        assert_eq!(abc, intersect([&c, &a, &b]));
        assert_eq!(abc, intersect([&b, &c, &a]));

        let ab = align(
            intersect([&a, &b])
                .into_iter()
                .map(|m| obs(m.year, m.month, 1, 0.0))
                .collect::<Vec<_>>(),
        );
        assert_eq!(abc, intersect([&ab, &c]));
        assert_eq!(abc, vec![month(2021, 3), month(2022, 1)]);
    }

    #[test]
    fn test_intersect_edge_cases() {
        let empty: Vec<&AlignedSeries> = Vec::new();
        assert!(intersect(empty).is_empty());

        let a = monthly(2020, 5);
        assert_eq!(intersect([&a]).len(), 5);

        let b = AlignedSeries::<Observation>::default();
        assert!(intersect([&a, &b]).is_empty());
    }

    #[test]
    fn test_collapse_monthly_keeps_last_close() {
        let collapsed = collapse_monthly(vec![
            (date(2024, 1, 2), 100.0),
            (date(2024, 1, 31), 104.0),
            (date(2024, 2, 29), 110.0),
            (date(2024, 2, 1), 90.0),
        ]);

        assert_eq!(collapsed.len(), 2);
        approx::assert_relative_eq!(collapsed[&month(2024, 1)], 104.0);
        approx::assert_relative_eq!(collapsed[&month(2024, 2)], 110.0);
    }
}
