//! Monthly returns from daily prices.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use stress_core::MonthKey;
use stress_ingestion::collapse_monthly;

/// Month-over-month returns keyed by the month the return ends in.
///
/// Prices are first collapsed to the last adjusted close of each month. A
/// return is recorded for every month after the first present one, and only
/// when the previous month's close is positive.
pub fn compute_monthly_returns<I>(prices: I) -> BTreeMap<MonthKey, f64>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let monthly: Vec<(MonthKey, f64)> = collapse_monthly(prices).into_iter().collect();

    monthly
        .windows(2)
        .filter_map(|pair| {
            let (_, prev) = pair[0];
            let (month, curr) = pair[1];
            (prev > 0.0).then(|| (month, (curr - prev) / prev))
        })
        .collect()
}
