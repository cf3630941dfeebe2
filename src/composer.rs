//! Turns a classification into response text and an empathy score.
//!
//! Precedence: the sentiment picks a template pool and the score, the
//! emotion appends a suffix, and sarcasm prepends an acknowledgment. Only
//! the sentiment affects the score.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::types::{ClassificationBundle, Emotion, ResponseRecord, Sentiment};

pub const NEGATIVE_TEMPLATES: &[&str] = &[
    "We're sorry to hear about your experience. Thank you for sharing your feedback, we'll do our best to make it right.",
    "We apologize for the trouble you've had. Your feedback helps us improve and we'll look into this right away.",
    "I'm sorry things didn't go as expected. We take this seriously and will work to fix it.",
];

pub const POSITIVE_TEMPLATES: &[&str] = &[
    "We're happy to hear that things went well! Thanks so much for your feedback.",
    "Thank you for the kind words! We're delighted you had a good experience.",
    "It's great to hear you're satisfied. We appreciate you taking the time to let us know.",
];

pub const NEUTRAL_TEMPLATES: &[&str] = &[
    "Thank you for your feedback. We appreciate you taking the time to share your thoughts.",
    "Thanks for reaching out. Your comments have been noted and shared with our team.",
    "We appreciate your input and will use it to keep improving.",
];

pub const SARCASM_ACKNOWLEDGMENT: &str =
    "We sense some sarcasm in your message, and we want to make sure we truly understand your concerns.";

pub const FALLBACK_RESPONSE: &str =
    "Thank you for your feedback. We were unable to analyse it automatically, but a member of our team will review it.";
pub const FALLBACK_EMPATHY: f64 = 0.5;

pub fn empathy_score(sentiment: Sentiment) -> f64 {
    match sentiment {
        Sentiment::Negative => 0.9,
        Sentiment::Positive => 0.8,
        Sentiment::Neutral => 0.7,
    }
}

pub fn templates(sentiment: Sentiment) -> &'static [&'static str] {
    match sentiment {
        Sentiment::Negative => NEGATIVE_TEMPLATES,
        Sentiment::Positive => POSITIVE_TEMPLATES,
        Sentiment::Neutral => NEUTRAL_TEMPLATES,
    }
}

pub fn emotion_suffix(emotion: Emotion) -> Option<&'static str> {
    match emotion {
        Emotion::Joy => Some("We're glad we could bring a smile to your day."),
        Emotion::Anger => Some("We understand your frustration and want to make this right."),
        Emotion::Sadness => Some("We're sorry this left you feeling down, and we're here to help."),
        Emotion::Neutral => None,
    }
}

/// Composes a response. Template choice is drawn from `rng`, so a seeded
/// generator gives reproducible output.
pub fn generate_response<R: Rng + ?Sized>(
    _text: &str,
    bundle: &ClassificationBundle,
    rng: &mut R,
) -> ResponseRecord {
    let sentiment = bundle.sentiment.category;
    let pool = templates(sentiment);
    let base = pool.choose(rng).copied().unwrap_or(pool[0]);

    let mut response_text = base.to_string();
    if let Some(suffix) = emotion_suffix(bundle.emotion.category) {
        response_text.push(' ');
        response_text.push_str(suffix);
    }
    if bundle.sarcasm.category {
        response_text = format!("{SARCASM_ACKNOWLEDGMENT} {response_text}");
    }

    ResponseRecord {
        response_text,
        empathy_score: empathy_score(sentiment),
    }
}

/// Response used for a batch item whose processing failed.
pub fn fallback_response() -> ResponseRecord {
    ResponseRecord {
        response_text: FALLBACK_RESPONSE.to_string(),
        empathy_score: FALLBACK_EMPATHY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bundle(sentiment: Sentiment, sarcasm: bool, emotion: Emotion) -> ClassificationBundle {
        ClassificationBundle {
            sentiment: Label::new(sentiment, 0.8),
            sarcasm: Label::new(sarcasm, 0.8),
            emotion: Label::new(emotion, 0.8),
        }
    }

    #[test]
    fn every_combination_is_complete() {
        let mut rng = StdRng::seed_from_u64(7);
        for sentiment in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
            for emotion in [Emotion::Joy, Emotion::Anger, Emotion::Sadness, Emotion::Neutral] {
                for sarcasm in [true, false] {
                    let record = generate_response("text", &bundle(sentiment, sarcasm, emotion), &mut rng);
                    assert!(!record.response_text.is_empty());
                    assert!((0.0..=1.0).contains(&record.empathy_score));
                    assert_eq!(record.empathy_score, empathy_score(sentiment));
                }
            }
        }
    }

    #[test]
    fn negative_sarcastic_starts_with_acknowledgment_then_template() {
        let mut rng = StdRng::seed_from_u64(1);
        let record = generate_response("Oh great, it broke again", &bundle(Sentiment::Negative, true, Emotion::Neutral), &mut rng);

        let rest = record
            .response_text
            .strip_prefix(SARCASM_ACKNOWLEDGMENT)
            .expect("acknowledgment first")
            .trim_start();
        assert!(NEGATIVE_TEMPLATES.contains(&rest));
        assert_eq!(record.empathy_score, 0.9);
    }

    #[test]
    fn emotion_suffix_is_appended_after_template() {
        let mut rng = StdRng::seed_from_u64(3);
        let record = generate_response("so happy", &bundle(Sentiment::Positive, false, Emotion::Joy), &mut rng);

        let suffix = emotion_suffix(Emotion::Joy).unwrap();
        let base = record.response_text.strip_suffix(suffix).unwrap().trim_end();
        assert!(POSITIVE_TEMPLATES.contains(&base));
        assert_eq!(record.empathy_score, 0.8);
    }

    #[test]
    fn neutral_emotion_adds_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let record = generate_response("ok", &bundle(Sentiment::Neutral, false, Emotion::Neutral), &mut rng);
        assert!(NEUTRAL_TEMPLATES.contains(&record.response_text.as_str()));
        assert_eq!(record.empathy_score, 0.7);
    }

    #[test]
    fn same_seed_same_choice() {
        let input = bundle(Sentiment::Negative, false, Emotion::Anger);
        let first: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..5).map(|_| generate_response("x", &input, &mut rng)).collect()
        };
        let second: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..5).map(|_| generate_response("x", &input, &mut rng)).collect()
        };
        assert_eq!(first, second);
    }
}
