use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(Sentiment::Positive),
            "negative" | "neg" => Ok(Sentiment::Negative),
            "neutral" | "neu" | "neut" => Ok(Sentiment::Neutral),
            other => anyhow::bail!("Unrecognised sentiment label: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Anger,
    Sadness,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classifier verdict. The confidence is always present, including on
/// fallback paths where it is a fixed constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Label<C> {
    pub category: C,
    pub confidence: f64,
}

impl<C> Label<C> {
    pub const fn new(category: C, confidence: f64) -> Self {
        Self {
            category,
            confidence,
        }
    }
}

pub type SentimentLabel = Label<Sentiment>;
pub type SarcasmLabel = Label<bool>;
pub type EmotionLabel = Label<Emotion>;

/// The three independent verdicts for one piece of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "ClassificationView")]
pub struct ClassificationBundle {
    pub sentiment: SentimentLabel,
    pub sarcasm: SarcasmLabel,
    pub emotion: EmotionLabel,
}

impl ClassificationBundle {
    /// Substituted for an item whose processing failed.
    pub const FALLBACK: Self = Self {
        sentiment: Label::new(Sentiment::Neutral, 0.5),
        sarcasm: Label::new(false, 0.5),
        emotion: Label::new(Emotion::Neutral, 0.5),
    };
}

#[derive(Debug, Serialize)]
struct ClassificationView {
    sentiment: Sentiment,
    sentiment_confidence: f64,
    sarcasm: bool,
    sarcasm_confidence: f64,
    emotion: Emotion,
    emotion_confidence: f64,
}

impl From<ClassificationBundle> for ClassificationView {
    fn from(bundle: ClassificationBundle) -> Self {
        Self {
            sentiment: bundle.sentiment.category,
            sentiment_confidence: bundle.sentiment.confidence,
            sarcasm: bundle.sarcasm.category,
            sarcasm_confidence: bundle.sarcasm.confidence,
            emotion: bundle.emotion.category,
            emotion_confidence: bundle.emotion.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    pub response_text: String,
    pub empathy_score: f64,
}

/// Output of the pipeline for one text item. `error` is only set on batch
/// entries whose processing failed and were replaced with defaults.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub input_text: String,
    pub classification: ClassificationBundle,
    pub ai_response: ResponseRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Flat row handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub customer_text: String,
    pub sentiment: String,
    pub response_text: String,
    pub empathy_score: f64,
    pub sarcasm: bool,
    pub emotion: String,
    pub created_at: String,
}

impl From<&Analysis> for FeedbackRecord {
    fn from(analysis: &Analysis) -> Self {
        Self {
            customer_text: analysis.input_text.clone(),
            sentiment: analysis.classification.sentiment.category.to_string(),
            response_text: analysis.ai_response.response_text.clone(),
            empathy_score: analysis.ai_response.empathy_score,
            sarcasm: analysis.classification.sarcasm.category,
            emotion: analysis.classification.emotion.category.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondRequest {
    pub customer_text: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespondBatchRequest {
    pub customer_texts: Option<serde_json::Value>,
}
