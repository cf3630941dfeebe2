use anyhow::{Context, Result, bail};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct InferenceConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Debug stand-in for a secret: shows whether it is set, never its value.
pub(crate) fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

/// One scored label from a hosted text-classification model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f64,
}

// Hosted pipelines return either a flat list or one list per input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationPayload {
    Nested(Vec<Vec<ScoredLabel>>),
    Flat(Vec<ScoredLabel>),
}

impl ClassificationPayload {
    fn into_top(self) -> Option<ScoredLabel> {
        match self {
            ClassificationPayload::Nested(outer) => outer.into_iter().next()?.into_iter().next(),
            ClassificationPayload::Flat(labels) => labels.into_iter().next(),
        }
    }
}

/// Client for a remote text-classification endpoint.
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    url: String,
    token: Option<String>,
}

impl fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceClient")
            .field("url", &self.url)
            .field("token", &redact(&self.token))
            .finish_non_exhaustive()
    }
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build inference HTTP client")?;

        Ok(Self {
            client,
            url: config.url,
            token: config.token,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("Inference token is not a valid header value")?,
            );
        }
        Ok(headers)
    }

    /// Classifies `text` and returns the top-ranked label.
    #[tracing::instrument(skip(self, text), fields(url = %self.url, text_len = text.len()))]
    pub async fn classify(&self, text: &str) -> Result<ScoredLabel> {
        let response = self
            .client
            .post(&self.url)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "inputs": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Inference request failed with status {status}: {body}");
        }

        let payload: ClassificationPayload = response
            .json()
            .await
            .context("Malformed inference response")?;

        payload
            .into_top()
            .ok_or_else(|| anyhow::anyhow!("Inference response contained no labels"))
    }
}
