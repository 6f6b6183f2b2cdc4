//! Composite stress scoring.
//!
//! Aligns every active indicator onto the shared monthly calendar, scores the
//! latest value of each against its trailing window, and combines the
//! (optionally inverted) z-scores into a weighted composite.

use crate::classifier::RegimeClassifier;
use crate::normalizer::RollingNormalizer;
use std::collections::HashMap;
use stress_core::config::ScoringConfig;
use stress_core::{
    CompositeMeta, CompositeResult, CompositeScore, Config, Error, HistoryRow, IndicatorConfig,
    IndicatorResult, MonthKey, Observation, Result, WeightPolicy,
};
use stress_ingestion::{align, intersect, AlignedSeries};
use tracing::{debug, warn};

/// Composite scoring engine.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    scoring: ScoringConfig,
    normalizer: RollingNormalizer,
    classifier: RegimeClassifier,
}

/// An active indicator restricted to the common months.
struct AlignedIndicator<'a> {
    config: &'a IndicatorConfig,
    aligned: AlignedSeries,
    /// Values over `common_months`, same indexing.
    values: Vec<f64>,
}

/// Alignment shared by latest and history scoring.
struct Alignment<'a> {
    indicators: Vec<AlignedIndicator<'a>>,
    common_months: Vec<MonthKey>,
    weight_sum: f64,
}

/// Scores for one window.
struct WindowScore {
    z_scores: Vec<f64>,
    composite: f64,
}

impl CompositeScorer {
    /// Create a scorer from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            scoring: config.scoring.clone(),
            normalizer: RollingNormalizer::new(config.scoring.min_sigma),
            classifier: RegimeClassifier::new(config.thresholds),
        }
    }

    /// Rolling window in months.
    pub fn window(&self) -> usize {
        self.scoring.window
    }

    /// Score the most recent fully aligned month.
    ///
    /// `series` maps series id to its observations in any order.
    pub fn compute_latest(
        &self,
        configs: &[IndicatorConfig],
        series: &HashMap<String, Vec<Observation>>,
    ) -> Result<CompositeResult> {
        let alignment = self.align(configs, series)?;
        let window = self.scoring.window;
        let end = alignment.common_months.len();
        let current_month = alignment.common_months[end - 1];

        let scored = self.score_window(&alignment, end - window..end)?;

        let indicators = alignment
            .indicators
            .iter()
            .zip(&scored.z_scores)
            .map(|(ind, &z)| {
                // current_month is in the intersection, so every series has it
                let date = ind
                    .aligned
                    .get(&current_month)
                    .map(|o| o.date)
                    .ok_or_else(|| {
                        Error::data(format!(
                            "{} has no observation for {current_month}",
                            ind.config.series_id
                        ))
                    })?;
                Ok(IndicatorResult {
                    series_id: ind.config.series_id.clone(),
                    date,
                    value: ind.values[end - 1],
                    z_score: z,
                    regime: self.classifier.classify(z),
                    weight: ind.config.weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            month = %current_month,
            composite = scored.composite,
            indicators = indicators.len(),
            "computed latest composite"
        );

        Ok(CompositeResult {
            month: current_month,
            composite: CompositeScore {
                score: scored.composite,
                regime: self.classifier.classify(scored.composite),
            },
            meta: CompositeMeta {
                window,
                aligned_months: end,
                indicator_count: indicators.len(),
            },
            indicators,
        })
    }

    /// Score every month that has a full trailing window, oldest first.
    ///
    /// Each row only sees data up to and including its own month.
    pub fn compute_history(
        &self,
        configs: &[IndicatorConfig],
        series: &HashMap<String, Vec<Observation>>,
    ) -> Result<Vec<HistoryRow>> {
        let alignment = self.align(configs, series)?;
        let window = self.scoring.window;

        let rows = (window - 1..alignment.common_months.len())
            .map(|i| {
                let scored = self.score_window(&alignment, i + 1 - window..i + 1)?;
                Ok(HistoryRow {
                    month: alignment.common_months[i],
                    z_scores: alignment
                        .indicators
                        .iter()
                        .zip(scored.z_scores)
                        .map(|(ind, z)| (ind.config.series_id.clone(), z))
                        .collect(),
                    composite: scored.composite,
                    regime: self.classifier.classify(scored.composite),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = rows.len(), window, "computed composite history");
        Ok(rows)
    }

    /// Align the active indicators and check there is enough common history.
    fn align<'a>(
        &self,
        configs: &'a [IndicatorConfig],
        series: &HashMap<String, Vec<Observation>>,
    ) -> Result<Alignment<'a>> {
        if self.scoring.window == 0 {
            return Err(Error::config("window must be at least one month"));
        }

        let mut active: Vec<&IndicatorConfig> =
            configs.iter().filter(|c| c.include_in_composite).collect();
        if active.is_empty() {
            return Err(Error::NoIndicatorsConfigured);
        }
        active.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.series_id.cmp(&b.series_id))
        });

        for config in &active {
            if !(config.weight >= 0.0 && config.weight.is_finite()) {
                return Err(Error::config(format!(
                    "{} has invalid weight {}",
                    config.series_id, config.weight
                )));
            }
        }

        let mut aligned: Vec<(&IndicatorConfig, AlignedSeries)> = Vec::with_capacity(active.len());
        for config in active {
            match series.get(&config.series_id) {
                Some(obs) if !obs.is_empty() => {
                    aligned.push((config, align(obs.iter().cloned())));
                }
                _ => debug!(series_id = %config.series_id, "no observations, dropping indicator"),
            }
        }
        if aligned.is_empty() {
            return Err(Error::NoIndicatorData);
        }

        let common_months = intersect(aligned.iter().map(|(_, a)| a));
        let window = self.scoring.window;
        if common_months.len() < window {
            warn!(
                aligned_months = common_months.len(),
                required = window,
                "not enough aligned data"
            );
            return Err(Error::InsufficientAlignedData {
                aligned_months: common_months.len(),
                required: window,
            });
        }

        let weight_sum: f64 = aligned.iter().map(|(c, _)| c.weight).sum();
        if weight_sum <= 0.0 {
            match self.scoring.weight_policy {
                WeightPolicy::Reject => {
                    return Err(Error::DegenerateWeights {
                        indicator_count: aligned.len(),
                    })
                }
                WeightPolicy::Neutral => warn!(
                    indicators = aligned.len(),
                    "indicator weights sum to zero, composite resolves to 0.0"
                ),
            }
        }

        let mut indicators = Vec::with_capacity(aligned.len());
        for (config, series) in aligned {
            let values = common_months
                .iter()
                .map(|m| series.get(m).map(|o| o.value).unwrap_or(f64::NAN))
                .collect();
            indicators.push(AlignedIndicator {
                config,
                aligned: series,
                values,
            });
        }

        Ok(Alignment {
            indicators,
            common_months,
            weight_sum,
        })
    }

    /// Z-score each indicator's last value in `range` and combine them.
    ///
    /// Only the months inside `range` must be finite.
    fn score_window(
        &self,
        alignment: &Alignment<'_>,
        range: std::ops::Range<usize>,
    ) -> Result<WindowScore> {
        let mut weighted_sum = 0.0;
        let mut z_scores = Vec::with_capacity(alignment.indicators.len());
        for ind in &alignment.indicators {
            let window = &ind.values[range.clone()];
            if let Some(offset) = window.iter().position(|v| !v.is_finite()) {
                let month = alignment.common_months[range.start + offset];
                return Err(Error::data(format!(
                    "{} has a non-finite value for {month}",
                    ind.config.series_id
                )));
            }
            let z = self.normalizer.score_latest(window);
            let z = if ind.config.invert_sign { -z } else { z };
            weighted_sum += z * ind.config.weight;
            z_scores.push(z);
        }

        let composite = if alignment.weight_sum > 0.0 {
            weighted_sum / alignment.weight_sum
        } else {
            0.0
        };

        Ok(WindowScore {
            z_scores,
            composite,
        })
    }
}
