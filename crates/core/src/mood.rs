use crate::trend::clamp_sentiment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Emotional state of the simulated patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoodState {
    Nervous,
    Calming,
    Reassured,
}

impl MoodState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodState::Nervous => "Nervous",
            MoodState::Calming => "Calming",
            MoodState::Reassured => "Reassured",
        }
    }
}

impl fmt::Display for MoodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a sentiment sample onto a mood using two ordered thresholds.
///
/// `sentiment < nervous` is Nervous, `nervous <= sentiment < calming` is Calming,
/// anything at or above `calming` is Reassured. Input is clamped to `[-1, 1]` first.
pub fn derive_mood(sentiment: f64, nervous_threshold: f64, calming_threshold: f64) -> MoodState {
    let sentiment = clamp_sentiment(sentiment);
    if sentiment < nervous_threshold {
        MoodState::Nervous
    } else if sentiment < calming_threshold {
        MoodState::Calming
    } else {
        MoodState::Reassured
    }
}

/// Holds the patient's current mood. Transitions depend only on the latest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodStateMachine {
    nervous_threshold: f64,
    calming_threshold: f64,
    current: MoodState,
    sentiment: f64,
}

impl MoodStateMachine {
    /// Thresholds are expected to be validated already (see `EngineConfig::validated`).
    pub fn new(nervous_threshold: f64, calming_threshold: f64, seed_sentiment: f64) -> Self {
        let sentiment = clamp_sentiment(seed_sentiment);
        Self {
            nervous_threshold,
            calming_threshold,
            current: derive_mood(sentiment, nervous_threshold, calming_threshold),
            sentiment,
        }
    }

    /// Feeds a new sample. Returns the new state only if it differs from the previous one.
    pub fn update(&mut self, sentiment: f64) -> Option<MoodState> {
        self.sentiment = clamp_sentiment(sentiment);
        let next = derive_mood(self.sentiment, self.nervous_threshold, self.calming_threshold);
        if next == self.current {
            return None;
        }
        tracing::debug!(from = %self.current, to = %next, sentiment = self.sentiment, "mood changed");
        self.current = next;
        Some(next)
    }

    pub fn current(&self) -> MoodState {
        self.current
    }

    pub fn sentiment(&self) -> f64 {
        self.sentiment
    }
}
