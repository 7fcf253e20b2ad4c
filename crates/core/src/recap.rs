/// Therapist turns between two recap prompts.
pub const DEFAULT_RECAP_INTERVAL: usize = 5;

pub const RECAP_PROMPT: &str = "Quick Recap: What is one open-ended question you could ask next?";

/// A recap is due on every positive multiple of `interval`.
pub fn recap_due(therapist_turns: usize, interval: usize) -> bool {
    interval > 0 && therapist_turns > 0 && therapist_turns % interval == 0
}

/// Tracks therapist turns and whether a recap prompt is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecapScheduler {
    interval: usize,
    therapist_turns: usize,
    due: bool,
}

impl RecapScheduler {
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            therapist_turns: 0,
            due: false,
        }
    }

    /// Recomputed from the count alone, so a dismissed recap never hides the next one.
    pub fn update(&mut self, therapist_turns: usize) -> bool {
        self.therapist_turns = therapist_turns;
        self.due = recap_due(therapist_turns, self.interval);
        self.due
    }

    pub fn dismiss(&mut self) {
        self.due = false;
    }

    pub fn is_due(&self) -> bool {
        self.due
    }

    pub fn therapist_turns(&self) -> usize {
        self.therapist_turns
    }

    pub fn prompt(&self) -> Option<&'static str> {
        self.due.then_some(RECAP_PROMPT)
    }
}
