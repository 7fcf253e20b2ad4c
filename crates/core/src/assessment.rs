use serde::{Deserialize, Serialize};

/// Scores above this bar count as a strength.
pub const DEFAULT_HIGH_BAR: f64 = 80.0;

/// Therapist performance as reported by the analysis backend, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScore {
    pub confidence: f64,
    pub empathy: f64,
    pub question_quality: f64,
}

impl Default for AssessmentScore {
    fn default() -> Self {
        Self {
            confidence: 50.0,
            empathy: 50.0,
            question_quality: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Confidence,
    Empathy,
    QuestionQuality,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::Confidence,
        Dimension::Empathy,
        Dimension::QuestionQuality,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Confidence => "Confidence",
            Dimension::Empathy => "Empathy",
            Dimension::QuestionQuality => "Question Quality",
        }
    }

    pub fn value(self, score: &AssessmentScore) -> f64 {
        match self {
            Dimension::Confidence => score.confidence,
            Dimension::Empathy => score.empathy,
            Dimension::QuestionQuality => score.question_quality,
        }
    }

    fn strength(self) -> &'static str {
        match self {
            Dimension::Confidence => "High confidence in responses",
            Dimension::Empathy => "Strong empathy shown",
            Dimension::QuestionQuality => "Excellent question quality",
        }
    }

    fn suggestion(self) -> &'static str {
        match self {
            Dimension::Confidence => "Work on expressing more confidence",
            Dimension::Empathy => "Try to show more empathy",
            Dimension::QuestionQuality => "Ask more open-ended, high-quality questions",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub suggestions: Vec<String>,
}

/// One statement per dimension: a strength above `high_bar`, otherwise a suggestion.
pub fn derive_feedback(score: &AssessmentScore, high_bar: f64) -> Feedback {
    let mut feedback = Feedback::default();
    for dimension in Dimension::ALL {
        if dimension.value(score) > high_bar {
            feedback.strengths.push(dimension.strength().to_string());
        } else {
            feedback.suggestions.push(dimension.suggestion().to_string());
        }
    }
    feedback
}

/// Raw scores as shown to the trainee, e.g. `("Empathy", "60%")`.
pub fn display_values(score: &AssessmentScore) -> [(&'static str, String); 3] {
    Dimension::ALL.map(|d| (d.label(), format!("{}%", d.value(score))))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentScorer {
    high_bar: f64,
}

impl Default for AssessmentScorer {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_BAR)
    }
}

impl AssessmentScorer {
    pub fn new(high_bar: f64) -> Self {
        Self { high_bar }
    }

    pub fn feedback(&self, score: &AssessmentScore) -> Feedback {
        derive_feedback(score, self.high_bar)
    }
}
