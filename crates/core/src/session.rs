use crate::SessionEvent;
use crate::assessment::{AssessmentScore, AssessmentScorer};
use crate::backend::PatientBackend;
use crate::bloom::BloomLevel;
use crate::config::EngineConfig;
use crate::mood::MoodState;
use crate::session_state::{Message, SessionExport, SessionState};
use crate::speech::SpeechSynthesizer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// Why a submission was not processed. Nothing is mutated in either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyInput,
    Busy,
}

/// What a processed turn changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    pub reply: Option<String>,
    pub sentiment: Option<f64>,
    pub mood_changed: Option<MoodState>,
    pub assessment: Option<AssessmentScore>,
    pub advanced_to: Option<BloomLevel>,
    pub recap_due: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    Skipped(SkipReason),
    Processed(TurnReport),
}

impl TurnResult {
    pub fn report(&self) -> Option<&TurnReport> {
        match self {
            TurnResult::Processed(report) => Some(report),
            TurnResult::Skipped(_) => None,
        }
    }
}

/// Closes a turn on every exit path, including a dropped future. An
/// unfinished turn is marked abandoned so `loading` never sticks.
struct TurnGuard {
    busy: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::Sender<SessionEvent>,
    finished: bool,
}

impl TurnGuard {
    fn abandon(state: &mut SessionState, events: &mpsc::Sender<SessionEvent>) {
        if let Some(error) = state.abandon_turn() {
            tracing::warn!("turn dropped before completion");
            if let Err(e) = events.try_send(SessionEvent::TurnFailed(error)) {
                tracing::warn!("Failed to publish session event: {e}");
            }
        }
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if self.finished {
            self.busy.store(false, Ordering::Release);
            return;
        }
        match self.state.try_lock() {
            Ok(mut state) => {
                Self::abandon(&mut state, &self.events);
                self.busy.store(false, Ordering::Release);
            }
            // The lock is only ever held briefly; finish once it is free.
            Err(_) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let busy = self.busy.clone();
                    let state = self.state.clone();
                    let events = self.events.clone();
                    handle.spawn(async move {
                        Self::abandon(&mut *state.lock().await, &events);
                        busy.store(false, Ordering::Release);
                    });
                }
                Err(_) => self.busy.store(false, Ordering::Release),
            },
        }
    }
}

/// Sequences turns and owns the session state.
///
/// The state lock is never held across a backend call. Overlapping
/// submissions are refused by the busy flag instead of queueing.
pub struct SessionController<B: PatientBackend> {
    config: EngineConfig,
    backend: B,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    voice_enabled: AtomicBool,
    scorer: AssessmentScorer,
    state: Arc<Mutex<SessionState>>,
    busy: Arc<AtomicBool>,
    events: mpsc::Sender<SessionEvent>,
}

impl<B: PatientBackend> SessionController<B> {
    pub fn new(
        config: EngineConfig,
        backend: B,
        speech: Option<Arc<dyn SpeechSynthesizer>>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let config = config.validated();
        let state = SessionState::new(&config);
        tracing::info!(
            session_id = %state.session_id,
            level = %state.bloom_level(),
            mood = %state.current_mood(),
            "session started"
        );
        Self {
            scorer: AssessmentScorer::new(config.high_bar),
            voice_enabled: AtomicBool::new(speech.is_some()),
            config,
            backend,
            speech,
            state: Arc::new(Mutex::new(state)),
            busy: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs one therapist turn: reply generation, then performance analysis.
    pub async fn submit_turn(&self, text: &str) -> TurnResult {
        let text = text.trim();
        if text.is_empty() {
            return TurnResult::Skipped(SkipReason::EmptyInput);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("turn already in flight, ignoring submission");
            return TurnResult::Skipped(SkipReason::Busy);
        }
        let mut turn = TurnGuard {
            busy: self.busy.clone(),
            state: self.state.clone(),
            events: self.events.clone(),
            finished: false,
        };

        let mut report = TurnReport::default();
        let level = {
            let mut state = self.state.lock().await;
            state.loading = true;
            state.last_error = None;
            state.push_message(Message::therapist(text));
            state.bloom_level()
        };

        match self.backend.chat(text, level).await {
            Ok(chat) => {
                let history = {
                    let mut state = self.state.lock().await;
                    let message = Message::patient(chat.reply.clone(), chat.sentiment);
                    let message_id = message.id;
                    state.push_message(message);
                    let sample = state.trend.push(chat.sentiment);
                    report.mood_changed = state.mood.update(sample);
                    report.reply = Some(chat.reply.clone());
                    report.sentiment = Some(sample);

                    tracing::info!(
                        session_id = %state.session_id,
                        user_input = text,
                        ai_response = %chat.reply,
                        sentiment = sample,
                        patient_state = %state.current_mood(),
                        "interaction"
                    );
                    self.emit(SessionEvent::PatientReplied {
                        message_id,
                        reply: chat.reply.clone(),
                        sentiment: sample,
                    });
                    if let Some(mood) = report.mood_changed {
                        self.emit(SessionEvent::MoodChanged(mood));
                    }
                    self.speak(message_id, &chat.reply);

                    state.recent_history(self.config.history_window).to_vec()
                };

                match self.backend.analyze(text, &history).await {
                    Ok(analysis) => {
                        let mut state = self.state.lock().await;
                        let score = analysis.score();
                        state.assessment = score;
                        state.feedback = self.scorer.feedback(&score);
                        if !analysis.feedback.trim().is_empty() {
                            state.hint = analysis.feedback.clone();
                        }
                        report.assessment = Some(score);
                        self.emit(SessionEvent::AssessmentUpdated {
                            score,
                            feedback: state.feedback.clone(),
                            hint: state.hint.clone(),
                        });

                        if let Some(advance) = state.bloom.maybe_advance(score.question_quality) {
                            report.advanced_to = Some(advance.to);
                            self.emit(SessionEvent::BloomAdvanced {
                                level: advance.to,
                                notification: advance.notification,
                            });
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "analysis request failed");
                        report.error = Some(format!("Analysis failed: {e}"));
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat request failed");
                report.error = Some(format!("Patient reply failed: {e}"));
            }
        }

        let mut state = self.state.lock().await;
        let therapist_turns = state.therapist_turns();
        report.recap_due = state.recap.update(therapist_turns);
        if report.recap_due {
            if let Some(prompt) = state.recap.prompt() {
                self.emit(SessionEvent::RecapDue(prompt.to_string()));
            }
        }
        if let Some(error) = &report.error {
            state.last_error = Some(error.clone());
            self.emit(SessionEvent::TurnFailed(error.clone()));
        }
        state.loading = false;
        turn.finished = true;

        TurnResult::Processed(report)
    }

    /// The trainee picks a difficulty directly, bypassing score-based advancement.
    pub async fn select_bloom_level(&self, level: BloomLevel) {
        let mut state = self.state.lock().await;
        if state.bloom_level() != level {
            tracing::info!(from = %state.bloom_level(), to = %level, "bloom level selected");
            state.bloom.select(level);
        }
    }

    pub async fn dismiss_recap(&self) {
        self.state.lock().await.recap.dismiss();
    }

    /// Voice can only be turned on when a synthesizer was configured.
    pub fn set_voice_enabled(&self, enabled: bool) -> bool {
        let enabled = enabled && self.speech.is_some();
        self.voice_enabled.store(enabled, Ordering::Release);
        enabled
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn export(&self) -> SessionExport {
        self.state.lock().await.export()
    }

    /// Final export; logs the end of the session.
    pub async fn end(&self) -> SessionExport {
        let state = self.state.lock().await;
        tracing::info!(
            session_id = %state.session_id,
            total_interactions = state.therapist_turns(),
            "session ended"
        );
        state.export()
    }

    fn speak(&self, message_id: Uuid, reply: &str) {
        let Some(speech) = self.speech.clone() else {
            return;
        };
        if !self.voice_enabled() {
            return;
        }
        let events = self.events.clone();
        let reply = reply.to_string();
        tokio::spawn(async move {
            match speech.synthesize(&reply).await {
                Ok(audio) => {
                    let event = SessionEvent::SpeechReady { message_id, audio };
                    if let Err(e) = events.try_send(event) {
                        tracing::warn!("Failed to deliver synthesized speech: {e}");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "speech synthesis failed"),
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.events.try_send(event) {
            tracing::warn!("Failed to publish session event: {e}");
        }
    }
}
