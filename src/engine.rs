use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::deberta_engine::{DebertaConfig, DebertaTextModel};
use crate::error::PipelineError;

/// Raw output of a local model: the argmax class index and its label name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub index: u32,
    pub label: String,
}

/// A loaded model plus its paired tokenizer, able to label a single text.
pub trait TextModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<Prediction>;
}

/// Shared handle to a classifier's local model.
///
/// Predictions hold the read side while they run, so [`ModelSlot::replace`]
/// waits for in-flight predictions before swapping the model.
#[derive(Clone, Default)]
pub struct ModelSlot {
    inner: Arc<RwLock<Option<Arc<dyn TextModel>>>>,
}

impl ModelSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: impl TextModel + 'static) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(Arc::new(model)))),
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Returns `Ok(None)` when no model is loaded.
    ///
    /// Inference runs on the blocking pool; a panic inside the model comes
    /// back as an error.
    pub async fn predict(&self, text: &str) -> Result<Option<Prediction>> {
        let guard = self.inner.read().await;
        let Some(model) = guard.as_ref().map(Arc::clone) else {
            return Ok(None);
        };

        let text = text.to_string();
        let prediction = tokio::task::spawn_blocking(move || model.predict(&text)).await??;
        drop(guard);
        Ok(Some(prediction))
    }

    pub async fn replace(&self, model: Option<Arc<dyn TextModel>>) {
        *self.inner.write().await = model;
    }
}

/// Loads a model for a slot, treating absence or failure as "no model".
#[tracing::instrument(skip(config))]
pub async fn load_optional(name: &str, config: Option<&DebertaConfig>) -> Option<Arc<dyn TextModel>> {
    let Some(config) = config else {
        tracing::info!("No {name} model configured, classifier will use fallbacks");
        return None;
    };

    match DebertaTextModel::new(config.clone()).await {
        Ok(model) => {
            tracing::info!("Loaded {name} model");
            Some(Arc::new(model))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load {name} model, classifier will use fallbacks");
            None
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ReloadReport {
    pub sentiment_loaded: bool,
    pub sarcasm_loaded: bool,
}

/// The model slots of every classifier together with where their artifacts live.
#[derive(Clone)]
pub struct ModelRegistry {
    pub sentiment: ModelSlot,
    pub sarcasm: ModelSlot,
    sentiment_source: Option<DebertaConfig>,
    sarcasm_source: Option<DebertaConfig>,
}

impl ModelRegistry {
    pub fn new(sentiment_source: Option<DebertaConfig>, sarcasm_source: Option<DebertaConfig>) -> Self {
        Self {
            sentiment: ModelSlot::empty(),
            sarcasm: ModelSlot::empty(),
            sentiment_source,
            sarcasm_source,
        }
    }

    /// Registry with pre-populated slots and no artifact sources.
    pub fn from_slots(sentiment: ModelSlot, sarcasm: ModelSlot) -> Self {
        Self {
            sentiment,
            sarcasm,
            sentiment_source: None,
            sarcasm_source: None,
        }
    }

    /// Initial load at startup. Missing artifacts leave the slot empty.
    pub async fn load(&self) {
        self.sentiment
            .replace(load_optional("sentiment", self.sentiment_source.as_ref()).await)
            .await;
        self.sarcasm
            .replace(load_optional("sarcasm", self.sarcasm_source.as_ref()).await)
            .await;
    }

    /// Re-reads configured artifacts and swaps them in.
    ///
    /// A slot whose artifacts fail to load keeps its current model, and the
    /// failure is reported as [`PipelineError::Model`] once every slot has
    /// been tried.
    #[tracing::instrument(skip(self))]
    pub async fn reload(&self) -> crate::error::Result<ReloadReport> {
        let mut failures = Vec::new();

        for (name, slot, source) in [
            ("sentiment", &self.sentiment, &self.sentiment_source),
            ("sarcasm", &self.sarcasm, &self.sarcasm_source),
        ] {
            let Some(source) = source else {
                continue;
            };
            match DebertaTextModel::new(source.clone()).await {
                Ok(model) => {
                    slot.replace(Some(Arc::new(model))).await;
                    tracing::info!("Reloaded {name} model");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to reload {name} model, keeping current one");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }

        if !failures.is_empty() {
            return Err(PipelineError::Model(failures.join("; ")));
        }

        Ok(ReloadReport {
            sentiment_loaded: self.sentiment.is_loaded().await,
            sarcasm_loaded: self.sarcasm.is_loaded().await,
        })
    }
}
