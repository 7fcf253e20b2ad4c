//! Engine tuning knobs.
//!
//! The values here are plain data. Loading them from the environment is the
//! job of the binary; the engine only asks that they pass `validated()`.

use crate::assessment::DEFAULT_HIGH_BAR;
use crate::bloom::{BloomLevel, DEFAULT_BLOOM_THRESHOLDS};
use crate::recap::DEFAULT_RECAP_INTERVAL;

pub const DEFAULT_NERVOUS_THRESHOLD: f64 = -0.3;
pub const DEFAULT_CALMING_THRESHOLD: f64 = 0.1;
/// Gap restored between the two mood thresholds when they are misordered.
pub const THRESHOLD_GAP: f64 = 0.2;
/// Messages sent to the analysis backend as context.
pub const DEFAULT_HISTORY_WINDOW: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub nervous_threshold: f64,
    pub calming_threshold: f64,
    pub bloom_thresholds: Vec<f64>,
    pub start_level: BloomLevel,
    pub recap_interval: usize,
    pub history_window: usize,
    pub high_bar: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nervous_threshold: DEFAULT_NERVOUS_THRESHOLD,
            calming_threshold: DEFAULT_CALMING_THRESHOLD,
            bloom_thresholds: DEFAULT_BLOOM_THRESHOLDS.to_vec(),
            start_level: BloomLevel::Apply,
            recap_interval: DEFAULT_RECAP_INTERVAL,
            history_window: DEFAULT_HISTORY_WINDOW,
            high_bar: DEFAULT_HIGH_BAR,
        }
    }
}

impl EngineConfig {
    /// Applies the auto-corrections. Nothing here is fatal; each fix is logged.
    pub fn validated(mut self) -> Self {
        if !self.nervous_threshold.is_finite() || !self.calming_threshold.is_finite() {
            tracing::warn!(
                nervous = self.nervous_threshold,
                calming = self.calming_threshold,
                "mood thresholds must be finite, using defaults"
            );
            self.nervous_threshold = DEFAULT_NERVOUS_THRESHOLD;
            self.calming_threshold = DEFAULT_CALMING_THRESHOLD;
        }

        if self.nervous_threshold >= self.calming_threshold {
            tracing::warn!(
                nervous = self.nervous_threshold,
                calming = self.calming_threshold,
                "nervous threshold should be below calming threshold, correcting"
            );
            self.nervous_threshold = self.calming_threshold - THRESHOLD_GAP;
        }

        if self.recap_interval == 0 {
            tracing::warn!(
                "recap interval must be positive, using {}",
                DEFAULT_RECAP_INTERVAL
            );
            self.recap_interval = DEFAULT_RECAP_INTERVAL;
        }

        if self.history_window == 0 {
            tracing::warn!(
                "history window must be positive, using {}",
                DEFAULT_HISTORY_WINDOW
            );
            self.history_window = DEFAULT_HISTORY_WINDOW;
        }

        let transitions = BloomLevel::LADDER.len() - 1;
        if self.bloom_thresholds.len() > transitions {
            tracing::warn!(
                given = self.bloom_thresholds.len(),
                "more Bloom thresholds than level transitions, ignoring the extra ones"
            );
            self.bloom_thresholds.truncate(transitions);
        } else if self.bloom_thresholds.len() < transitions {
            let last = BloomLevel::from_index(self.bloom_thresholds.len())
                .unwrap_or(BloomLevel::Create);
            tracing::debug!(%last, "Bloom advancement stops at this level");
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_unchanged() {
        let config = EngineConfig::default();
        assert_eq!(config.clone().validated(), config);
        assert_eq!(config.start_level, BloomLevel::Apply);
        assert_eq!(config.bloom_thresholds, vec![60.0, 75.0, 90.0]);
    }

    #[test]
    fn test_misordered_thresholds_are_corrected() {
        let config = EngineConfig {
            nervous_threshold: 0.4,
            calming_threshold: 0.1,
            ..EngineConfig::default()
        }
        .validated();
        assert!((config.nervous_threshold - (-0.1)).abs() < 1e-9);
        assert_eq!(config.calming_threshold, 0.1);

        let equal = EngineConfig {
            nervous_threshold: 0.1,
            calming_threshold: 0.1,
            ..EngineConfig::default()
        }
        .validated();
        assert!(equal.nervous_threshold < equal.calming_threshold);
    }

    #[test]
    fn test_non_finite_mood_thresholds_fall_back_to_defaults() {
        let config = EngineConfig {
            nervous_threshold: f64::NAN,
            calming_threshold: 0.5,
            ..EngineConfig::default()
        }
        .validated();
        assert_eq!(config.nervous_threshold, DEFAULT_NERVOUS_THRESHOLD);
        assert_eq!(config.calming_threshold, DEFAULT_CALMING_THRESHOLD);
    }

    #[test]
    fn test_zero_interval_and_long_threshold_list() {
        let config = EngineConfig {
            recap_interval: 0,
            history_window: 0,
            bloom_thresholds: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0],
            ..EngineConfig::default()
        }
        .validated();
        assert_eq!(config.recap_interval, DEFAULT_RECAP_INTERVAL);
        assert_eq!(config.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.bloom_thresholds.len(), 5);
    }
}
