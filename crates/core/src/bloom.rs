use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six tiers of Bloom's taxonomy, used as a difficulty ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

/// Question-quality scores needed to leave the first three levels.
pub const DEFAULT_BLOOM_THRESHOLDS: [f64; 3] = [60.0, 75.0, 90.0];

impl BloomLevel {
    pub const LADDER: [BloomLevel; 6] = [
        BloomLevel::Remember,
        BloomLevel::Understand,
        BloomLevel::Apply,
        BloomLevel::Analyze,
        BloomLevel::Evaluate,
        BloomLevel::Create,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::LADDER.get(index).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn name(self) -> &'static str {
        match self {
            BloomLevel::Remember => "Remember",
            BloomLevel::Understand => "Understand",
            BloomLevel::Apply => "Apply",
            BloomLevel::Analyze => "Analyze",
            BloomLevel::Evaluate => "Evaluate",
            BloomLevel::Create => "Create",
        }
    }

    /// Lowercase form sent to the chat backend.
    pub fn wire_name(self) -> &'static str {
        match self {
            BloomLevel::Remember => "remember",
            BloomLevel::Understand => "understand",
            BloomLevel::Apply => "apply",
            BloomLevel::Analyze => "analyze",
            BloomLevel::Evaluate => "evaluate",
            BloomLevel::Create => "create",
        }
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown Bloom level: {0}")]
pub struct ParseBloomLevelError(pub String);

impl FromStr for BloomLevel {
    type Err = ParseBloomLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::LADDER
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseBloomLevelError(s.to_string()))
    }
}

/// Returns the level index after evaluating one score.
///
/// Advances by exactly one when the current level is not terminal and
/// `question_quality >= thresholds[current_index]`. A transition without a
/// threshold never fires.
pub fn maybe_advance(current_index: usize, question_quality: f64, thresholds: &[f64]) -> usize {
    if current_index + 1 >= BloomLevel::LADDER.len() {
        return current_index;
    }
    match thresholds.get(current_index) {
        Some(&threshold) if question_quality >= threshold => current_index + 1,
        _ => current_index,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BloomAdvance {
    pub from: BloomLevel,
    pub to: BloomLevel,
    pub notification: String,
}

/// Forward-only tracker over the Bloom ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomProgressionTracker {
    level: BloomLevel,
    thresholds: Vec<f64>,
}

impl BloomProgressionTracker {
    pub fn new(start: BloomLevel, thresholds: Vec<f64>) -> Self {
        Self {
            level: start,
            thresholds,
        }
    }

    pub fn level(&self) -> BloomLevel {
        self.level
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn maybe_advance(&mut self, question_quality: f64) -> Option<BloomAdvance> {
        let from = self.level;
        let index = maybe_advance(from.index(), question_quality, &self.thresholds);
        let to = BloomLevel::from_index(index).filter(|to| *to != from)?;
        self.level = to;
        tracing::info!(%from, %to, question_quality, "bloom level advanced");
        Some(BloomAdvance {
            from,
            to,
            notification: format!("Great job! You've advanced to the Bloom level: {to}"),
        })
    }

    /// Explicit choice made by the trainee; unlike advancement this may move down.
    pub fn select(&mut self, level: BloomLevel) {
        self.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_names() {
        assert_eq!("apply".parse::<BloomLevel>(), Ok(BloomLevel::Apply));
        assert_eq!(" Evaluate ".parse::<BloomLevel>(), Ok(BloomLevel::Evaluate));
        assert!("synthesize".parse::<BloomLevel>().is_err());
        assert_eq!(BloomLevel::Analyze.wire_name(), "analyze");
        assert_eq!(BloomLevel::Create.to_string(), "Create");
        assert!(BloomLevel::Create.is_terminal());
        assert_eq!(BloomLevel::Remember.next(), Some(BloomLevel::Understand));
    }

    #[test]
    fn test_maybe_advance_rule() {
        let thresholds = DEFAULT_BLOOM_THRESHOLDS;
        assert_eq!(maybe_advance(0, 60.0, &thresholds), 1);
        assert_eq!(maybe_advance(0, 59.9, &thresholds), 0);
        assert_eq!(maybe_advance(1, 100.0, &thresholds), 2);
        assert_eq!(maybe_advance(2, 89.0, &thresholds), 2);
        assert_eq!(maybe_advance(2, 90.0, &thresholds), 3);
        // No threshold configured for Analyze -> Evaluate.
        assert_eq!(maybe_advance(3, 100.0, &thresholds), 3);
        // Terminal level absorbs.
        assert_eq!(maybe_advance(5, 100.0, &[0.0; 5]), 5);
        assert_eq!(maybe_advance(9, 100.0, &[0.0; 5]), 9);
    }

    #[test]
    fn test_tracker_never_regresses_and_moves_one_step() {
        let mut tracker = BloomProgressionTracker::new(
            BloomLevel::Remember,
            vec![10.0, 20.0, 30.0, 40.0, 50.0],
        );
        let scores = [100.0, 0.0, 5.0, 100.0, 25.0, 100.0, 100.0, 0.0, 100.0, 100.0];
        let mut previous = tracker.level();
        for score in scores {
            let before = tracker.level();
            let advance = tracker.maybe_advance(score);
            let after = tracker.level();
            assert!(after >= previous, "level regressed");
            assert!(after.index() <= before.index() + 1, "skipped a level");
            if let Some(advance) = advance {
                assert_eq!(advance.from, before);
                assert_eq!(advance.to, after);
                assert!(score >= tracker.thresholds()[before.index()]);
            } else {
                assert_eq!(before, after);
            }
            previous = after;
        }
        assert_eq!(tracker.level(), BloomLevel::Create);
        assert_eq!(tracker.maybe_advance(100.0), None);
    }

    #[test]
    fn test_advance_notification_text() {
        let mut tracker =
            BloomProgressionTracker::new(BloomLevel::Remember, DEFAULT_BLOOM_THRESHOLDS.to_vec());
        let advance = tracker.maybe_advance(65.0).expect("should advance");
        assert_eq!(
            advance.notification,
            "Great job! You've advanced to the Bloom level: Understand"
        );
    }
}
