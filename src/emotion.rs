use crate::sentiment::words;
use crate::types::{Emotion, EmotionLabel, Label};

pub const FALLBACK: EmotionLabel = Label::new(Emotion::Neutral, 0.5);

/// A keyword rule: any listed word in the text yields `emotion`.
#[derive(Debug, Clone)]
pub struct EmotionRule {
    pub emotion: Emotion,
    pub keywords: Vec<String>,
    pub confidence: f64,
}

impl EmotionRule {
    /// `confidence` is clamped to [0, 1].
    pub fn new(emotion: Emotion, keywords: &[&str], confidence: f64) -> Self {
        Self {
            emotion,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    fn matches(&self, words: &[String]) -> bool {
        words.iter().any(|word| self.keywords.contains(word))
    }
}

/// Rule-based emotion detection. Rules are checked in order; the first
/// match wins.
#[derive(Debug, Clone)]
pub struct EmotionClassifier {
    rules: Vec<EmotionRule>,
}

impl Default for EmotionClassifier {
    fn default() -> Self {
        Self::new(vec![
            EmotionRule::new(
                Emotion::Joy,
                &["happy", "glad", "delighted", "love", "great", "thrilled"],
                0.8,
            ),
            EmotionRule::new(
                Emotion::Anger,
                &["angry", "furious", "annoyed", "mad", "outraged"],
                0.8,
            ),
            EmotionRule::new(
                Emotion::Sadness,
                &["sad", "unhappy", "disappointed", "upset", "depressed"],
                0.8,
            ),
        ])
    }
}

impl EmotionClassifier {
    pub fn new(rules: Vec<EmotionRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: EmotionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn detect_emotion(&self, text: &str) -> EmotionLabel {
        let words: Vec<String> = words(text).collect();
        self.rules
            .iter()
            .find(|rule| rule.matches(&words))
            .map(|rule| Label::new(rule.emotion, rule.confidence))
            .unwrap_or(FALLBACK)
    }
}
