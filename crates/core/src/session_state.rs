use crate::assessment::{AssessmentScore, AssessmentScorer, Feedback};
use crate::bloom::{BloomLevel, BloomProgressionTracker};
use crate::config::EngineConfig;
use crate::mood::{MoodState, MoodStateMachine};
use crate::recap::RecapScheduler;
use crate::trend::{SentimentTrend, clamp_sentiment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SEED_GREETING: &str =
    "Hello, I'm glad we could meet today. I've been feeling overwhelmed.";
pub const SEED_SENTIMENT: f64 = -0.3;
pub const INITIAL_HINT: &str = "Start by establishing rapport and asking open-ended questions.";
pub const TURN_CANCELLED: &str = "Turn cancelled before it completed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Therapist,
    Patient,
}

/// One entry of the session log. Only patient messages carry a sentiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "sender")]
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

impl Message {
    pub fn therapist(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Therapist,
            content: content.into(),
            timestamp: Utc::now(),
            sentiment: None,
        }
    }

    pub fn patient(content: impl Into<String>, sentiment: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Patient,
            content: content.into(),
            timestamp: Utc::now(),
            sentiment: Some(clamp_sentiment(sentiment)),
        }
    }
}

/// Everything a presentation layer needs to draw the session.
///
/// Owned by `SessionController`; callers only ever see clones.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    messages: Vec<Message>,
    pub trend: SentimentTrend,
    pub mood: MoodStateMachine,
    pub assessment: AssessmentScore,
    pub feedback: Feedback,
    pub hint: String,
    pub bloom: BloomProgressionTracker,
    pub recap: RecapScheduler,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    /// A fresh session: one seeded patient greeting and default scores.
    pub fn new(config: &EngineConfig) -> Self {
        let seed = Message::patient(SEED_GREETING, SEED_SENTIMENT);
        let mut trend = SentimentTrend::new();
        trend.push(SEED_SENTIMENT);
        let assessment = AssessmentScore::default();

        Self {
            session_id: Uuid::new_v4(),
            messages: vec![seed],
            trend,
            mood: MoodStateMachine::new(
                config.nervous_threshold,
                config.calming_threshold,
                SEED_SENTIMENT,
            ),
            assessment,
            feedback: AssessmentScorer::new(config.high_bar).feedback(&assessment),
            hint: INITIAL_HINT.to_string(),
            bloom: BloomProgressionTracker::new(
                config.start_level,
                config.bloom_thresholds.clone(),
            ),
            recap: RecapScheduler::new(config.recap_interval),
            loading: false,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Closes a turn whose caller went away mid-flight and returns the error
    /// it records. The therapist message and anything already applied stay.
    pub(crate) fn abandon_turn(&mut self) -> Option<String> {
        if !self.loading {
            return None;
        }
        let therapist_turns = self.therapist_turns();
        self.recap.update(therapist_turns);
        self.loading = false;
        self.last_error = Some(TURN_CANCELLED.to_string());
        self.last_error.clone()
    }

    /// The last `window` messages, oldest first.
    pub fn recent_history(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }

    pub fn therapist_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Therapist)
            .count()
    }

    pub fn current_mood(&self) -> MoodState {
        self.mood.current()
    }

    pub fn bloom_level(&self) -> BloomLevel {
        self.bloom.level()
    }

    pub fn export(&self) -> SessionExport {
        SessionExport {
            session_id: self.session_id,
            messages: self.messages.clone(),
            assessment: self.assessment,
            emotional_progress: self.trend.clone(),
            bloom_level: self.bloom.level(),
            date: Utc::now(),
        }
    }
}

/// JSON snapshot written at the end of a session. Never read back by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
    pub assessment: AssessmentScore,
    pub emotional_progress: SentimentTrend,
    pub bloom_level: BloomLevel,
    pub date: DateTime<Utc>,
}

impl SessionExport {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_seeded() {
        let state = SessionState::new(&EngineConfig::default());
        assert_eq!(state.messages().len(), 1);
        let seed = &state.messages()[0];
        assert_eq!(seed.role, Role::Patient);
        assert_eq!(seed.sentiment, Some(SEED_SENTIMENT));
        assert_eq!(state.trend.samples(), &[SEED_SENTIMENT]);
        // -0.3 sits on the nervous threshold, which belongs to Calming.
        assert_eq!(state.current_mood(), MoodState::Calming);
        assert_eq!(state.bloom_level(), BloomLevel::Apply);
        assert_eq!(state.assessment, AssessmentScore::default());
        assert_eq!(state.feedback.suggestions.len(), 3);
        assert_eq!(state.hint, INITIAL_HINT);
        assert_eq!(state.therapist_turns(), 0);
        assert!(!state.loading);
    }

    #[test]
    fn test_recent_history_window() {
        let mut state = SessionState::new(&EngineConfig::default());
        assert_eq!(state.recent_history(4).len(), 1);
        for i in 0..5 {
            state.push_message(Message::therapist(format!("question {i}")));
        }
        let window = state.recent_history(4);
        assert_eq!(window.len(), 4);
        assert_eq!(window[0].content, "question 1");
        assert_eq!(window[3].content, "question 4");
        assert_eq!(state.therapist_turns(), 5);
    }

    #[test]
    fn test_export_shape() {
        let mut state = SessionState::new(&EngineConfig::default());
        state.push_message(Message::therapist("How are you feeling today?"));

        let json = serde_json::to_value(state.export()).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][0]["sender"], "patient");
        assert_eq!(json["messages"][0]["sentiment"], -0.3);
        assert_eq!(json["messages"][1]["sender"], "therapist");
        assert!(json["messages"][1].get("sentiment").is_none());
        assert_eq!(json["assessment"]["questionQuality"], 50.0);
        assert_eq!(json["emotionalProgress"], serde_json::json!([-0.3]));
        assert_eq!(json["bloomLevel"], "Apply");
        assert!(json["date"].is_string());
    }
}
