use futures::FutureExt;
use metrics::counter;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use crate::composer::{self, generate_response};
use crate::emotion::EmotionClassifier;
use crate::error::{PipelineError, Result};
use crate::normalizer::{TextItem, normalize};
use crate::sarcasm::SarcasmClassifier;
use crate::sentiment::SentimentClassifier;
use crate::store::{FeedbackStore, NullStore};
use crate::tier::panic_message;
use crate::types::{Analysis, ClassificationBundle, FeedbackRecord};

/// Classifies feedback and composes replies, one item or a batch at a time.
pub struct Pipeline {
    sentiment: SentimentClassifier,
    sarcasm: SarcasmClassifier,
    emotion: EmotionClassifier,
    rng: Mutex<StdRng>,
    store: Arc<dyn FeedbackStore>,
}

impl Pipeline {
    pub fn new(
        sentiment: SentimentClassifier,
        sarcasm: SarcasmClassifier,
        emotion: EmotionClassifier,
    ) -> Self {
        Self {
            sentiment,
            sarcasm,
            emotion,
            rng: Mutex::new(StdRng::from_entropy()),
            store: Arc::new(NullStore),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn FeedbackStore>) -> Self {
        self.store = store;
        self
    }

    /// Makes template selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn store(&self) -> &Arc<dyn FeedbackStore> {
        &self.store
    }

    /// Runs the three classifiers. They are independent; order does not matter.
    pub async fn classify(&self, text: &str) -> ClassificationBundle {
        ClassificationBundle {
            sentiment: self.sentiment.classify_sentiment(text).await,
            sarcasm: self.sarcasm.detect_sarcasm(text).await,
            emotion: self.emotion.detect_emotion(text),
        }
    }

    /// Classifies and composes a response, without persisting.
    #[tracing::instrument(skip(self, item), fields(text_len = item.as_str().len()))]
    pub async fn analyze(&self, item: &TextItem) -> Analysis {
        let classification = self.classify(item.as_str()).await;
        let ai_response = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            generate_response(item.as_str(), &classification, &mut *rng)
        };

        Analysis {
            input_text: item.to_string(),
            classification,
            ai_response,
            error: None,
        }
    }

    /// Single-item entry point: validates, analyzes and records one text.
    pub async fn respond(&self, raw: Option<&Value>) -> Result<Analysis> {
        let item = normalize(raw)?;
        let analysis = self.analyze(&item).await;
        self.persist(&analysis).await;
        Ok(analysis)
    }

    /// Processes a list of texts in order.
    ///
    /// Items that are not non-blank strings are skipped. Classifier failures
    /// are absorbed by their fallback chains; anything else that panics while
    /// processing an item replaces that item with the fallback classification
    /// and response, tagged with the error, and the batch carries on.
    #[tracing::instrument(skip(self, raw))]
    pub async fn process_batch(&self, raw: Option<&Value>) -> Result<Vec<Analysis>> {
        let items = match raw {
            None | Some(Value::Null) => {
                return Err(reject("Input list is missing"));
            }
            Some(Value::Array(items)) if items.is_empty() => {
                return Err(reject("Input list cannot be empty"));
            }
            Some(Value::Array(items)) => items,
            Some(_) => return Err(reject("Input must be a list of strings")),
        };

        tracing::info!(item_count = items.len(), "Processing batch");
        let mut results = Vec::with_capacity(items.len());

        for (index, value) in items.iter().enumerate() {
            let Some(item) = TextItem::from_value(value) else {
                tracing::debug!(index, "Skipping empty or non-string item");
                continue;
            };

            let analysis = isolated(&item, self.analyze(&item)).await;
            if analysis.error.is_none() {
                self.persist(&analysis).await;
            } else {
                tracing::error!(index, error = ?analysis.error, "Batch item failed, using defaults");
            }
            results.push(analysis);
        }

        if results.is_empty() {
            tracing::warn!("Batch contained no valid input");
            return Err(PipelineError::NoValidInput);
        }

        tracing::info!(result_count = results.len(), "Batch processed");
        Ok(results)
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    async fn persist(&self, analysis: &Analysis) {
        if let Err(e) = self.store.save(&FeedbackRecord::from(analysis)).await {
            tracing::error!(error = %e, "Failed to store feedback");
        }
    }
}

fn reject(reason: &str) -> PipelineError {
    tracing::warn!(reason, "Rejected batch input");
    PipelineError::Validation(reason.to_string())
}

/// Runs one item's analysis, replacing it with the fallback classification
/// and response if it panics.
async fn isolated<F>(item: &TextItem, analysis: F) -> Analysis
where
    F: Future<Output = Analysis>,
{
    match AssertUnwindSafe(analysis).catch_unwind().await {
        Ok(analysis) => analysis,
        Err(panic) => {
            counter!("batch_item_failures_total").increment(1);
            Analysis {
                input_text: item.to_string(),
                classification: ClassificationBundle::FALLBACK,
                ai_response: composer::fallback_response(),
                error: Some(panic_message(panic.as_ref())),
            }
        }
    }
}
