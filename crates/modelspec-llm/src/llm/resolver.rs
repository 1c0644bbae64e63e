use anyhow::Result;
use modelspec_core::config::{AppConfig, InferenceConfig, SamplingConfig};
use modelspec_core::interfaces::ArtifactResolver;
use modelspec_core::ModelStore;

use super::backend::{LlamaCppModel, LlamaTokenizer};

/// Resolves identifiers through the local model store to GGUF files and
/// loads them with llama.cpp.
pub struct LlamaResolver {
    store: ModelStore,
    verify_digests: bool,
    inference: InferenceConfig,
    sampling: SamplingConfig,
}

impl LlamaResolver {
    pub fn new(store: ModelStore, config: &AppConfig) -> Self {
        Self {
            store,
            verify_digests: config.store.verify_digests,
            inference: config.inference.clone(),
            sampling: config.sampling.clone(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.store.open(), config)
    }
}

impl ArtifactResolver for LlamaResolver {
    type Tokenizer = LlamaTokenizer;
    type Model = LlamaCppModel;

    fn resolve_tokenizer(&self, identifier: &str) -> Result<LlamaTokenizer> {
        let path = self.store.locate_weights(identifier, self.verify_digests)?;
        tracing::info!("Loading tokenizer from {}", path.display());
        LlamaTokenizer::load(&path)
    }

    fn resolve_model(&self, identifier: &str) -> Result<LlamaCppModel> {
        let path = self.store.locate_weights(identifier, self.verify_digests)?;
        tracing::info!(
            "Loading model from {} ({} GPU layers)",
            path.display(),
            self.inference.n_gpu_layers
        );
        LlamaCppModel::load(&path, &self.inference, &self.sampling)
    }
}
