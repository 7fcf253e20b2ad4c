//! Terminal presentation of a session: reading trainee input and printing
//! what the engine reports.

use crate::export;
use mindlink_core::SessionEvent;
use mindlink_core::assessment::display_values;
use mindlink_core::bloom::BloomLevel;
use mindlink_core::session_state::SessionState;
use mindlink_core::trend::display_percent;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Say(String),
    Level(BloomLevel),
    Dismiss,
    Voice,
    Status,
    Save,
    Quit,
    Help,
    Invalid(String),
}

pub const HELP: &str = "\
Type a message to speak to the patient, or one of:
  /level <name>  switch Bloom level (remember, understand, apply, analyze, evaluate, create)
  /dismiss       hide the current recap
  /voice         toggle spoken replies
  /status        show mood, level and scores
  /save          write a session export
  /quit          end the session";

pub fn parse_input(line: &str) -> ConsoleInput {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return ConsoleInput::Say(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name.to_ascii_lowercase().as_str() {
        "level" => match arg.parse() {
            Ok(level) => ConsoleInput::Level(level),
            Err(e) => ConsoleInput::Invalid(e.to_string()),
        },
        "dismiss" => ConsoleInput::Dismiss,
        "voice" => ConsoleInput::Voice,
        "status" => ConsoleInput::Status,
        "save" => ConsoleInput::Save,
        "quit" | "exit" => ConsoleInput::Quit,
        "help" => ConsoleInput::Help,
        other => ConsoleInput::Invalid(format!("unknown command /{other}, try /help")),
    }
}

pub fn render_status(state: &SessionState) -> String {
    let mut out = format!(
        "Mood: {} (sentiment {}%)\nBloom level: {}\nMessages: {}",
        state.current_mood(),
        display_percent(state.mood.sentiment()),
        state.bloom_level(),
        state.messages().len(),
    );
    for (label, value) in display_values(&state.assessment) {
        out.push_str(&format!("\n{label}: {value}"));
    }
    out.push_str(&format!("\nHint: {}", state.hint));
    if !state.feedback.strengths.is_empty() {
        out.push_str(&format!("\nStrengths: {}", state.feedback.strengths.join(", ")));
    }
    if !state.feedback.suggestions.is_empty() {
        out.push_str(&format!("\nSuggestions: {}", state.feedback.suggestions.join(", ")));
    }
    let trend: Vec<String> = state
        .trend
        .samples()
        .iter()
        .zip(state.trend.bands())
        .map(|(s, band)| format!("{}% ({})", display_percent(*s), band.label()))
        .collect();
    out.push_str(&format!("\nEmotional progress: {}", trend.join(" ")));
    if let Some(prompt) = state.recap.prompt() {
        out.push_str(&format!("\nRecap: {prompt}"));
    }
    out
}

/// Text shown for an event, if any. Audio is handled separately.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::PatientReplied { reply, .. } => Some(format!("Patient: {reply}")),
        SessionEvent::MoodChanged(mood) => Some(format!("[patient now {mood}]")),
        SessionEvent::AssessmentUpdated { score, hint, .. } => Some(format!(
            "[confidence {}% | empathy {}% | question quality {}%] Hint: {hint}",
            score.confidence, score.empathy, score.question_quality
        )),
        SessionEvent::BloomAdvanced { notification, .. } => Some(format!("*** {notification} ***")),
        SessionEvent::RecapDue(prompt) => Some(format!("--- Spaced Repetition Recap ---\n{prompt}")),
        SessionEvent::TurnFailed(error) => Some(format!("Error: {error}")),
        SessionEvent::SpeechReady { .. } => None,
    }
}

/// Prints events until the session drops its sender.
pub async fn render_events(mut events: mpsc::Receiver<SessionEvent>, audio_dir: PathBuf) {
    while let Some(event) = events.recv().await {
        if let SessionEvent::SpeechReady { message_id, audio } = &event {
            match export::write_audio(&audio_dir, *message_id, audio) {
                Ok(path) => tracing::debug!("Saved patient audio to {}", path.display()),
                Err(e) => tracing::warn!("Could not save patient audio: {e:#}"),
            }
        }
        if let Some(text) = render_event(&event) {
            println!("{text}");
        }
    }
}
