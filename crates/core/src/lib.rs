pub mod assessment;
pub mod backend;
pub mod bloom;
pub mod config;
pub mod error;
pub mod mood;
pub mod recap;
pub mod session;
pub mod session_state;
pub mod speech;
#[cfg(test)]
mod test_support;
pub mod trend;

use assessment::{AssessmentScore, Feedback};
use bloom::BloomLevel;
use mood::MoodState;
use uuid::Uuid;

/// State changes the session publishes to whoever draws it.
///
/// The engine never calls into a UI. Presentation code holds the receiving
/// end of the channel passed to `SessionController::new`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The patient's mood moved to a different state.
    MoodChanged(MoodState),
    PatientReplied {
        message_id: Uuid,
        reply: String,
        sentiment: f64,
    },
    AssessmentUpdated {
        score: AssessmentScore,
        feedback: Feedback,
        hint: String,
    },
    /// Difficulty went up one level; `notification` is meant to be shown briefly.
    BloomAdvanced {
        level: BloomLevel,
        notification: String,
    },
    RecapDue(String),
    /// A turn stopped early. The session stays usable.
    TurnFailed(String),
    /// Audio for a patient reply, produced off the turn's critical path.
    SpeechReady { message_id: Uuid, audio: Vec<u8> },
}
