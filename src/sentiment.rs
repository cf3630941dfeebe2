use anyhow::Result;
use async_trait::async_trait;

use crate::engine::ModelSlot;
use crate::tier::{FallbackChain, Tier};
use crate::types::{Label, Sentiment, SentimentLabel};

/// Confidence reported for every local-model prediction. The model's class
/// probabilities are not used; this is a fixed approximation.
pub const MODEL_CONFIDENCE: f64 = 0.8;

pub const FALLBACK: SentimentLabel = Label::new(Sentiment::Neutral, 0.5);

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad", "upset", "angry", "terrible", "awful", "horrible", "worst", "broken", "hate", "poor",
    "disappointed", "rude", "late",
];
const POSITIVE_KEYWORDS: &[&str] = &[
    "good", "great", "happy", "love", "excellent", "amazing", "wonderful", "fantastic", "thanks",
    "helpful", "perfect",
];

pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Labels text with the loaded local model.
pub struct ModelTier {
    slot: ModelSlot,
}

#[async_trait]
impl Tier<SentimentLabel> for ModelTier {
    fn name(&self) -> &'static str {
        "local_model"
    }

    async fn attempt(&self, text: &str) -> Result<Option<SentimentLabel>> {
        let Some(prediction) = self.slot.predict(text).await? else {
            return Ok(None);
        };
        let sentiment: Sentiment = prediction.label.parse()?;
        Ok(Some(Label::new(sentiment, MODEL_CONFIDENCE)))
    }
}

/// Keyword lexicon. Negative keywords take precedence; no match declines.
pub struct KeywordTier;

#[async_trait]
impl Tier<SentimentLabel> for KeywordTier {
    fn name(&self) -> &'static str {
        "keywords"
    }

    async fn attempt(&self, text: &str) -> Result<Option<SentimentLabel>> {
        let mut positive = false;
        for word in words(text) {
            if NEGATIVE_KEYWORDS.contains(&word.as_str()) {
                return Ok(Some(Label::new(Sentiment::Negative, 0.9)));
            }
            positive |= POSITIVE_KEYWORDS.contains(&word.as_str());
        }
        Ok(positive.then_some(Label::new(Sentiment::Positive, 0.8)))
    }
}

pub struct SentimentClassifier {
    chain: FallbackChain<SentimentLabel>,
}

impl SentimentClassifier {
    pub fn new(slot: ModelSlot, keyword_fallback: bool) -> Self {
        let mut chain = FallbackChain::new("sentiment", FALLBACK).with_tier(ModelTier { slot });
        if keyword_fallback {
            chain = chain.with_tier(KeywordTier);
        }
        Self { chain }
    }

    /// Never fails: an unavailable or failing model yields neutral at 0.5.
    pub async fn classify_sentiment(&self, text: &str) -> SentimentLabel {
        self.chain.resolve(text).await.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FailingModel, FixedModel};

    #[tokio::test]
    async fn model_label_with_placeholder_confidence() {
        let classifier = SentimentClassifier::new(ModelSlot::with_model(FixedModel(0, "Negative")), true);
        let label = classifier.classify_sentiment("I love it").await;
        assert_eq!(label, Label::new(Sentiment::Negative, MODEL_CONFIDENCE));
    }

    #[tokio::test]
    async fn no_model_falls_back_to_neutral() {
        let classifier = SentimentClassifier::new(ModelSlot::empty(), false);
        assert_eq!(classifier.classify_sentiment("This is bad").await, FALLBACK);
    }

    #[tokio::test]
    async fn failing_or_unmappable_model_falls_back() {
        let failing = SentimentClassifier::new(ModelSlot::with_model(FailingModel), false);
        assert_eq!(failing.classify_sentiment("text").await, FALLBACK);

        let unknown = SentimentClassifier::new(ModelSlot::with_model(FixedModel(5, "LABEL_5")), false);
        assert_eq!(unknown.classify_sentiment("text").await, FALLBACK);
    }

    #[tokio::test]
    async fn keyword_tier_scores_negative_over_positive() {
        let classifier = SentimentClassifier::new(ModelSlot::empty(), true);
        assert_eq!(
            classifier.classify_sentiment("This is bad and I am upset").await,
            Label::new(Sentiment::Negative, 0.9)
        );
        assert_eq!(
            classifier.classify_sentiment("Great service, but the food was awful").await,
            Label::new(Sentiment::Negative, 0.9)
        );
        assert_eq!(
            classifier.classify_sentiment("Thanks, that was helpful!").await,
            Label::new(Sentiment::Positive, 0.8)
        );
        assert_eq!(classifier.classify_sentiment("The order number is 42").await, FALLBACK);
    }

    #[test]
    fn words_split_on_punctuation() {
        let split: Vec<_> = words("Bad!! Really, don't.").collect();
        assert_eq!(split, ["bad", "really", "don't"]);
    }
}
