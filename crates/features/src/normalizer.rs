//! Rolling z-score normalization.
//!
//! Scores a value against the population statistics of its own trailing
//! window (denominator N, not N-1).

use statrs::statistics::Statistics;
use stress_core::MIN_SIGMA;

/// Z-score of `x` against `window` using the default degenerate threshold.
#[inline]
pub fn zscore(window: &[f64], x: f64) -> f64 {
    RollingNormalizer::default().zscore(window, x)
}

/// Z-score calculator with a configurable degenerate-sigma threshold.
#[derive(Debug, Clone, Copy)]
pub struct RollingNormalizer {
    /// Windows with a standard deviation below this score 0.0.
    min_sigma: f64,
}

impl RollingNormalizer {
    /// Create a new normalizer.
    pub fn new(min_sigma: f64) -> Self {
        Self { min_sigma }
    }

    /// Z-score of `x` against the window's population mean and deviation.
    ///
    /// Returns 0.0 for fewer than two samples or a (near) constant window.
    pub fn zscore(&self, window: &[f64], x: f64) -> f64 {
        if window.len() < 2 {
            return 0.0;
        }

        let mean = window.iter().mean();
        let sigma = window.iter().population_std_dev();

        // NaN sigma falls through to the neutral score as well
        if !(sigma >= self.min_sigma) {
            return 0.0;
        }

        (x - mean) / sigma
    }

    /// Z-score of the window's last value against the whole window.
    pub fn score_latest(&self, window: &[f64]) -> f64 {
        match window.last() {
            Some(&latest) => self.zscore(window, latest),
            None => 0.0,
        }
    }

    /// Degenerate threshold in use.
    pub fn min_sigma(&self) -> f64 {
        self.min_sigma
    }
}

impl Default for RollingNormalizer {
    fn default() -> Self {
        Self::new(MIN_SIGMA)
    }
}
