use anyhow::{Result, bail};
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::debertav2::{
    Config as DebertaV2Config, DebertaV2SeqClassificationModel, Id2Label,
};
use hf_hub::{Repo, RepoType, api::tokio::Api};
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::engine::{Prediction, TextModel};

/// A DeBERTa-v2 sequence classifier and the tokenizer it was trained with.
pub struct DebertaTextModel {
    model: DebertaV2SeqClassificationModel,
    tokenizer: Tokenizer,
    device: Device,
    id2label: Id2Label,
}

#[derive(Debug, Clone)]
pub struct DebertaConfig {
    pub model_id: Option<String>,
    pub model_path: Option<PathBuf>,
    pub revision: String,
    pub use_pth: bool,
    pub cpu: bool,
    pub max_sequence_length: usize,
    pub id2label: Option<HashMap<u32, String>>,
}

impl Default for DebertaConfig {
    fn default() -> Self {
        Self {
            model_id: None,
            model_path: None,
            revision: "main".to_string(),
            use_pth: false,
            cpu: false,
            max_sequence_length: 512,
            id2label: None,
        }
    }
}

/// Files making up one model: its config, tokenizer and weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelArtifacts {
    fn weights_name(use_pth: bool) -> &'static str {
        if use_pth {
            "pytorch_model.bin"
        } else {
            "model.safetensors"
        }
    }

    /// Uses the local directory when one is configured, otherwise fetches
    /// the files from the Hub.
    pub async fn resolve(config: &DebertaConfig) -> Result<Self> {
        let weights = Self::weights_name(config.use_pth);

        if let Some(base_path) = &config.model_path {
            if !base_path.is_dir() {
                bail!("Model path {} is not a directory.", base_path.display());
            }
            return Ok(Self {
                config: base_path.join("config.json"),
                tokenizer: base_path.join("tokenizer.json"),
                weights: base_path.join(weights),
            });
        }

        let Some(model_id) = config.model_id.clone() else {
            bail!("Either model_id or model_path must be specified");
        };
        let repo = Repo::with_revision(model_id, RepoType::Model, config.revision.clone());
        let api = Api::new()?.repo(repo);
        Ok(Self {
            config: api.get("config.json").await?,
            tokenizer: api.get("tokenizer.json").await?,
            weights: api.get(weights).await?,
        })
    }
}

impl DebertaTextModel {
    fn device(cpu: bool) -> Result<Device> {
        if cpu {
            Ok(Device::Cpu)
        } else if metal_is_available() {
            tracing::info!("Using metal acceleration");
            Ok(Device::new_metal(0)?)
        } else if cuda_is_available() {
            tracing::info!("Using CUDA GPU acceleration");
            Ok(Device::new_cuda(0)?)
        } else {
            tracing::info!(
                "CUDA not available, running on CPU. To run on GPU, build with `--features cuda`"
            );
            Ok(Device::Cpu)
        }
    }

    #[tracing::instrument(skip(config), fields(model_id = ?config.model_id, model_path = ?config.model_path, cpu = config.cpu))]
    pub async fn new(config: DebertaConfig) -> Result<Self> {
        let device = Self::device(config.cpu)?;

        let artifacts = ModelArtifacts::resolve(&config).await?;

        let model_config = std::fs::read_to_string(&artifacts.config)?;
        let model_config: DebertaV2Config = serde_json::from_str(&model_config)?;

        // Explicit id2label takes precedence over the model config's
        let id2label = if let Some(id2label) = config.id2label {
            id2label
        } else if let Some(id2label) = &model_config.id2label {
            id2label.clone()
        } else {
            bail!("Id2Label not found in the model configuration nor specified as a parameter");
        };

        let mut tokenizer = Tokenizer::from_file(&artifacts.tokenizer)
            .map_err(|e| anyhow::anyhow!("Tokenizer error: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_sequence_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Tokenizer truncation error: {e}"))?;

        let vb = if config.use_pth {
            VarBuilder::from_pth(
                &artifacts.weights,
                candle_transformers::models::debertav2::DTYPE,
                &device,
            )?
        } else {
            unsafe {
                VarBuilder::from_mmaped_safetensors(
                    &[&artifacts.weights],
                    candle_transformers::models::debertav2::DTYPE,
                    &device,
                )?
            }
        };

        let vb = vb.set_prefix("deberta");
        let model =
            DebertaV2SeqClassificationModel::load(vb, &model_config, Some(id2label.clone()))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            id2label,
        })
    }
}

impl TextModel for DebertaTextModel {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    fn predict(&self, text: &str) -> Result<Prediction> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization error: {e}"))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let logits = self
            .model
            .forward(&input_ids, Some(token_type_ids), Some(attention_mask))?;
        let index = logits
            .argmax(1)?
            .to_vec1::<u32>()?
            .first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Model returned no logits"))?;

        let label = self
            .id2label
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{index}"));

        Ok(Prediction { index, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_artifacts_follow_weight_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DebertaConfig {
            model_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let artifacts = ModelArtifacts::resolve(&config).await.unwrap();
        assert_eq!(artifacts.config, dir.path().join("config.json"));
        assert_eq!(artifacts.tokenizer, dir.path().join("tokenizer.json"));
        assert_eq!(artifacts.weights, dir.path().join("model.safetensors"));

        config.use_pth = true;
        let artifacts = ModelArtifacts::resolve(&config).await.unwrap();
        assert_eq!(artifacts.weights, dir.path().join("pytorch_model.bin"));
    }

    #[tokio::test]
    async fn missing_directory_or_source_is_an_error() {
        let missing = DebertaConfig {
            model_path: Some(PathBuf::from("/nonexistent/feedback-sense/model")),
            ..Default::default()
        };
        assert!(ModelArtifacts::resolve(&missing).await.is_err());
        assert!(ModelArtifacts::resolve(&DebertaConfig::default()).await.is_err());
    }
}
