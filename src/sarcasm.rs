use anyhow::Result;
use async_trait::async_trait;

use crate::engine::ModelSlot;
use crate::remote::InferenceClient;
use crate::tier::{FallbackChain, Tier};
use crate::types::{Label, SarcasmLabel};

/// Fixed confidences for local-model verdicts (not calibrated probabilities).
pub const SARCASTIC_CONFIDENCE: f64 = 0.8;
pub const SINCERE_CONFIDENCE: f64 = 0.2;

pub const FALLBACK: SarcasmLabel = Label::new(false, 0.5);
pub const BLANK_INPUT: SarcasmLabel = Label::new(false, 0.0);

pub const DEFAULT_REMOTE_LABEL: &str = "SARCASM";

/// Local binary model; class index 1 is sarcastic.
pub struct ModelTier {
    slot: ModelSlot,
}

#[async_trait]
impl Tier<SarcasmLabel> for ModelTier {
    fn name(&self) -> &'static str {
        "local_model"
    }

    async fn attempt(&self, text: &str) -> Result<Option<SarcasmLabel>> {
        Ok(self.slot.predict(text).await?.map(|prediction| {
            if prediction.index == 1 {
                Label::new(true, SARCASTIC_CONFIDENCE)
            } else {
                Label::new(false, SINCERE_CONFIDENCE)
            }
        }))
    }
}

/// Hosted classifier; its score is used directly as the confidence.
pub struct RemoteTier {
    client: InferenceClient,
    sarcastic_label: String,
}

impl RemoteTier {
    pub fn new(client: InferenceClient, sarcastic_label: impl Into<String>) -> Self {
        Self {
            client,
            sarcastic_label: sarcastic_label.into(),
        }
    }
}

#[async_trait]
impl Tier<SarcasmLabel> for RemoteTier {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn attempt(&self, text: &str) -> Result<Option<SarcasmLabel>> {
        let top = self.client.classify(text).await?;
        let sarcastic = top.label.eq_ignore_ascii_case(&self.sarcastic_label);
        Ok(Some(Label::new(sarcastic, top.score.clamp(0.0, 1.0))))
    }
}

pub struct SarcasmClassifier {
    chain: FallbackChain<SarcasmLabel>,
}

impl SarcasmClassifier {
    /// Tiers run local model, then remote service (when configured), then
    /// the static default.
    pub fn new(slot: ModelSlot, remote: Option<RemoteTier>) -> Self {
        let mut chain = FallbackChain::new("sarcasm", FALLBACK).with_tier(ModelTier { slot });
        if let Some(remote) = remote {
            chain = chain.with_tier(remote);
        }
        Self { chain }
    }

    pub async fn detect_sarcasm(&self, text: &str) -> SarcasmLabel {
        let text = text.trim();
        if text.is_empty() {
            return BLANK_INPUT;
        }
        self.chain.resolve(text).await.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FailingModel, FixedModel};
    use crate::remote::InferenceConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn remote_answering(label: &str, score: f64) -> (MockServer, RemoteTier) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[{ "label": label, "score": score }]])),
            )
            .mount(&server)
            .await;
        let tier = remote_tier(&server);
        (server, tier)
    }

    fn remote_tier(server: &MockServer) -> RemoteTier {
        let client = InferenceClient::new(InferenceConfig {
            url: server.uri(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        RemoteTier::new(client, DEFAULT_REMOTE_LABEL)
    }

    #[tokio::test]
    async fn local_model_uses_fixed_confidences() {
        let (server, remote) = remote_answering("SARCASM", 0.99).await;
        let sarcastic = SarcasmClassifier::new(ModelSlot::with_model(FixedModel(1, "1")), Some(remote));
        assert_eq!(sarcastic.detect_sarcasm("Oh wonderful").await, Label::new(true, 0.8));
        assert!(server.received_requests().await.unwrap().is_empty());

        let sincere = SarcasmClassifier::new(ModelSlot::with_model(FixedModel(0, "0")), None);
        assert_eq!(sincere.detect_sarcasm("Thank you").await, Label::new(false, 0.2));
    }

    #[tokio::test]
    async fn remote_used_when_local_missing() {
        let (_server, remote) = remote_answering("sarcasm", 0.73).await;
        let classifier = SarcasmClassifier::new(ModelSlot::empty(), Some(remote));
        assert_eq!(classifier.detect_sarcasm("Sure, great job").await, Label::new(true, 0.73));
    }

    #[tokio::test]
    async fn remote_used_when_local_fails() {
        let (_server, remote) = remote_answering("NOT_SARCASM", 0.64).await;
        let classifier = SarcasmClassifier::new(ModelSlot::with_model(FailingModel), Some(remote));
        assert_eq!(classifier.detect_sarcasm("It works").await, Label::new(false, 0.64));
    }

    #[tokio::test]
    async fn static_default_when_everything_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let classifier = SarcasmClassifier::new(ModelSlot::with_model(FailingModel), Some(remote_tier(&server)));
        assert_eq!(classifier.detect_sarcasm("whatever").await, FALLBACK);

        let bare = SarcasmClassifier::new(ModelSlot::empty(), None);
        assert_eq!(bare.detect_sarcasm("whatever").await, FALLBACK);
    }

    #[tokio::test]
    async fn blank_input_short_circuits() {
        let (server, remote) = remote_answering("SARCASM", 0.9).await;
        let classifier = SarcasmClassifier::new(ModelSlot::with_model(FixedModel(1, "1")), Some(remote));
        for text in ["", "   ", "\n\t"] {
            assert_eq!(classifier.detect_sarcasm(text).await, BLANK_INPUT);
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
