use serde::{Deserialize, Serialize};

/// Clamps a raw sentiment score into `[-1, 1]`. Non-finite input reads as neutral.
pub fn clamp_sentiment(sentiment: f64) -> f64 {
    if sentiment.is_finite() {
        sentiment.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Coarse classification of a sample, used when charting the trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentBand {
    Positive,
    Neutral,
    Negative,
}

impl SentimentBand {
    pub fn of(sample: f64) -> Self {
        if sample > 0.2 {
            SentimentBand::Positive
        } else if sample < -0.2 {
            SentimentBand::Negative
        } else {
            SentimentBand::Neutral
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SentimentBand::Positive => "positive",
            SentimentBand::Neutral => "neutral",
            SentimentBand::Negative => "negative",
        }
    }
}

/// Sentiment as a whole percentage, e.g. `-0.27` reads as `-27`.
pub fn display_percent(sample: f64) -> i64 {
    (sample * 100.0).round() as i64
}

/// Append-only record of patient sentiment, one sample per patient turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentimentTrend {
    samples: Vec<f64>,
}

impl SentimentTrend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and returns the stored (clamped) value.
    pub fn push(&mut self, sentiment: f64) -> f64 {
        let sample = clamp_sentiment(sentiment);
        self.samples.push(sample);
        sample
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn bands(&self) -> Vec<SentimentBand> {
        self.samples.iter().copied().map(SentimentBand::of).collect()
    }
}
