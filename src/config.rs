use clap::Parser;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::deberta_engine::DebertaConfig;
use crate::remote::{InferenceConfig, redact};

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Sentiment model ID on the Hugging Face Hub
    #[arg(long, env = "SENTIMENT_MODEL_ID")]
    pub sentiment_model_id: Option<String>,

    /// Local directory holding the sentiment model and tokenizer
    #[arg(long, env = "SENTIMENT_MODEL_PATH")]
    pub sentiment_model_path: Option<PathBuf>,

    /// Sentiment labels mapping in format "0=negative,1=neutral,2=positive"
    #[arg(long, env = "SENTIMENT_ID2LABEL")]
    pub sentiment_id2label: Option<String>,

    /// Sarcasm model ID on the Hugging Face Hub
    #[arg(long, env = "SARCASM_MODEL_ID")]
    pub sarcasm_model_id: Option<String>,

    /// Local directory holding the sarcasm model and tokenizer
    #[arg(long, env = "SARCASM_MODEL_PATH")]
    pub sarcasm_model_path: Option<PathBuf>,

    /// Model revision/branch on Hugging Face
    #[arg(long, env = "MODEL_REVISION", default_value = "main")]
    pub model_revision: String,

    /// Use PyTorch weights instead of safetensors
    #[arg(long, env = "USE_PTH")]
    pub use_pth: bool,

    /// Run on CPU instead of GPU
    #[arg(long, env = "CPU_ONLY")]
    pub cpu_only: bool,

    /// Maximum sequence length allowed
    #[arg(long, env = "MAX_SEQUENCE_LENGTH", default_value = "512")]
    pub max_sequence_length: usize,

    /// Remote text-classification endpoint used when no local sarcasm model answers
    #[arg(long, env = "SARCASM_INFERENCE_URL")]
    pub sarcasm_inference_url: Option<String>,

    /// Bearer token for the remote inference endpoint
    #[arg(long, env = "INFERENCE_TOKEN", hide_env_values = true)]
    pub inference_token: Option<String>,

    /// Remote label that means "sarcastic" (compared case-insensitively)
    #[arg(long, env = "SARCASM_LABEL", default_value = crate::sarcasm::DEFAULT_REMOTE_LABEL)]
    pub sarcasm_label: String,

    /// Timeout in seconds for remote inference requests
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS", default_value = "30")]
    pub inference_timeout_secs: u64,

    /// Fall back to keyword matching when the sentiment model is unavailable
    #[arg(long, env = "KEYWORD_SENTIMENT")]
    pub keyword_sentiment: bool,

    /// Seed for response template selection
    #[arg(long, env = "RESPONSE_SEED")]
    pub response_seed: Option<u64>,

    /// SQLite database URL for storing responses, e.g. "sqlite://feedback.db"
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

pub fn parse_id2label(labels: &str) -> HashMap<u32, String> {
    labels
        .split(',')
        .filter_map(|pair| {
            let mut parts = pair.split('=');
            let id = parts.next()?.trim().parse().ok()?;
            let label = parts.next()?.trim().to_string();
            Some((id, label))
        })
        .collect()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sentiment_model_id", &self.sentiment_model_id)
            .field("sentiment_model_path", &self.sentiment_model_path)
            .field("sentiment_id2label", &self.sentiment_id2label)
            .field("sarcasm_model_id", &self.sarcasm_model_id)
            .field("sarcasm_model_path", &self.sarcasm_model_path)
            .field("model_revision", &self.model_revision)
            .field("use_pth", &self.use_pth)
            .field("cpu_only", &self.cpu_only)
            .field("max_sequence_length", &self.max_sequence_length)
            .field("sarcasm_inference_url", &self.sarcasm_inference_url)
            .field("inference_token", &redact(&self.inference_token))
            .field("sarcasm_label", &self.sarcasm_label)
            .field("inference_timeout_secs", &self.inference_timeout_secs)
            .field("keyword_sentiment", &self.keyword_sentiment)
            .field("response_seed", &self.response_seed)
            .field("database_url", &self.database_url)
            .finish()
    }
}

/// Where each classifier's local model comes from. `None` means the
/// classifier runs on its fallback tiers only.
#[derive(Debug, Clone, Default)]
pub struct ModelSources {
    pub sentiment: Option<DebertaConfig>,
    pub sarcasm: Option<DebertaConfig>,
}

impl From<&Config> for ModelSources {
    fn from(config: &Config) -> Self {
        Self {
            sentiment: config.model_source(
                &config.sentiment_model_id,
                &config.sentiment_model_path,
                config.sentiment_id2label.as_deref().map(parse_id2label),
            ),
            sarcasm: config.model_source(&config.sarcasm_model_id, &config.sarcasm_model_path, None),
        }
    }
}

impl Config {
    fn model_source(
        &self,
        model_id: &Option<String>,
        model_path: &Option<PathBuf>,
        id2label: Option<HashMap<u32, String>>,
    ) -> Option<DebertaConfig> {
        if model_id.is_none() && model_path.is_none() {
            return None;
        }
        Some(DebertaConfig {
            model_id: model_id.clone(),
            model_path: model_path.clone(),
            revision: self.model_revision.clone(),
            use_pth: self.use_pth,
            cpu: self.cpu_only,
            max_sequence_length: self.max_sequence_length,
            id2label,
        })
    }

    /// Remote sarcasm endpoint settings, if a URL is configured.
    pub fn inference(&self) -> Option<InferenceConfig> {
        self.sarcasm_inference_url.as_ref().map(|url| InferenceConfig {
            url: url.clone(),
            token: self.inference_token.clone(),
            timeout: Duration::from_secs(self.inference_timeout_secs),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id2label_pairs() {
        let labels = parse_id2label("0=negative, 1=neutral,2=positive,bogus,x=y");
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[&1], "neutral");
    }

    #[test]
    fn sources_only_when_configured() {
        let config = Config::parse_from(["feedback-sense", "--sarcasm-model-path", "/models/sarcasm"]);
        let sources = ModelSources::from(&config);
        assert!(sources.sentiment.is_none());
        let sarcasm = sources.sarcasm.unwrap();
        assert_eq!(sarcasm.model_path, Some(PathBuf::from("/models/sarcasm")));
        assert_eq!(sarcasm.max_sequence_length, 512);
        assert!(config.inference().is_none());
        assert_eq!(config.sarcasm_label, "SARCASM");
    }

    #[test]
    fn inference_settings() {
        let config = Config::parse_from([
            "feedback-sense",
            "--sarcasm-inference-url",
            "https://inference.example/models/irony",
            "--inference-timeout-secs",
            "5",
        ]);
        let inference = config.inference().unwrap();
        assert_eq!(inference.timeout, Duration::from_secs(5));
        assert!(inference.token.is_none());
    }

    #[test]
    fn sentiment_source_carries_labels_and_shared_settings() {
        let config = Config::parse_from([
            "feedback-sense",
            "--sentiment-model-id",
            "org/sentiment-deberta",
            "--sentiment-id2label",
            "0=negative,1=neutral,2=positive",
            "--model-revision",
            "v2",
            "--cpu-only",
        ]);
        let sentiment = ModelSources::from(&config).sentiment.unwrap();
        assert_eq!(sentiment.model_id.as_deref(), Some("org/sentiment-deberta"));
        assert_eq!(sentiment.revision, "v2");
        assert!(sentiment.cpu);
        assert_eq!(sentiment.id2label.unwrap()[&2], "positive");
    }

    #[test]
    fn debug_output_hides_inference_token() {
        let config = Config::parse_from([
            "feedback-sense",
            "--sarcasm-inference-url",
            "https://inference.example/models/irony",
            "--inference-token",
            "hf_SUPERSECRET",
        ]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hf_SUPERSECRET"));
        assert!(rendered.contains(r#"inference_token: Some("***")"#));
        assert!(rendered.contains("inference.example"));
    }
}
