//! Regime classification of scores.

use stress_core::config::RegimeThresholds;
use stress_core::Regime;

/// Classify a score with the default thresholds.
#[inline]
pub fn classify(z: f64) -> Regime {
    RegimeClassifier::default().classify(z)
}

/// Maps a score to a regime using half-open buckets:
///
/// ```text
/// z < low_upper                    -> low
/// low_upper <= z < normal_upper    -> normal
/// normal_upper <= z < elevated_upper -> elevated
/// z >= elevated_upper              -> crisis
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RegimeClassifier {
    thresholds: RegimeThresholds,
}

impl RegimeClassifier {
    pub fn new(thresholds: RegimeThresholds) -> Self {
        Self { thresholds }
    }

    /// Classify a score.
    pub fn classify(&self, z: f64) -> Regime {
        let t = &self.thresholds;
        if z < t.low_upper {
            Regime::Low
        } else if z < t.normal_upper {
            Regime::Normal
        } else if z < t.elevated_upper {
            Regime::Elevated
        } else {
            Regime::Crisis
        }
    }
}
