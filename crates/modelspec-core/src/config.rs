use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::store::ModelStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// What the runner does when invoked without overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_max_length")]
    pub max_length: u32,
}

fn default_model() -> String {
    "gemma-2b:latest".into()
}
fn default_prompt() -> String {
    "Who are you?".into()
}
fn default_max_length() -> u32 {
    64
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            prompt: default_prompt(),
            max_length: default_max_length(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Store root. Unset means `$MODELS_DIR`, then `$HOME/.models`.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    #[serde(default = "default_verify_digests")]
    pub verify_digests: bool,
}

fn default_verify_digests() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            models_dir: None,
            verify_digests: default_verify_digests(),
        }
    }
}

impl StoreConfig {
    pub fn open(&self) -> ModelStore {
        match &self.models_dir {
            Some(dir) => ModelStore::new(dir),
            None => ModelStore::from_env(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_n_gpu_layers")]
    pub n_gpu_layers: u32,
    #[serde(default = "default_n_ctx")]
    pub n_ctx: u32,
    #[serde(default = "default_n_batch")]
    pub n_batch: u32,
}

fn default_n_gpu_layers() -> u32 {
    99
}
fn default_n_ctx() -> u32 {
    2048
}
fn default_n_batch() -> u32 {
    512
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            n_gpu_layers: default_n_gpu_layers(),
            n_ctx: default_n_ctx(),
            n_batch: default_n_batch(),
        }
    }
}

/// Token sampling. No temperature means greedy decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_seed")]
    pub seed: u32,
}

fn default_top_p() -> f32 {
    0.9
}
fn default_seed() -> u32 {
    42
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: None,
            top_p: default_top_p(),
            seed: default_seed(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback chain: explicit path → ./config/default.toml → hardcoded defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Self {
        if let Some(path) = explicit_path {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {e}", path.display());
                }
            }
        }

        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            match Self::load(default_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!("Failed to load default config: {e}");
                }
            }
        }

        tracing::debug!("Using hardcoded default configuration");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_gemma_example() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.run.model, "gemma-2b:latest");
        assert_eq!(cfg.run.prompt, "Who are you?");
        assert_eq!(cfg.run.max_length, 64);
        assert!(cfg.store.verify_digests);
        assert!(cfg.sampling.temperature.is_none());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [run]
            max_length = 128

            [sampling]
            temperature = 0.7
            "#,
        )
        .unwrap();
        assert_eq!(cfg.run.max_length, 128);
        assert_eq!(cfg.run.model, "gemma-2b:latest");
        assert_eq!(cfg.sampling.temperature, Some(0.7));
        assert_eq!(cfg.sampling.seed, 42);
        assert_eq!(cfg.inference.n_ctx, 2048);
    }

    #[test]
    fn explicit_models_dir_opens_that_store() {
        let cfg: AppConfig = toml::from_str("[store]\nmodels_dir = \"/srv/models\"\n").unwrap();
        assert_eq!(cfg.store.open().root(), Path::new("/srv/models"));
    }

    #[test]
    fn unreadable_config_falls_back_to_defaults() {
        let cfg = AppConfig::load_or_default(Some(Path::new("/nonexistent/config.toml")));
        assert_eq!(cfg.run.max_length, 64);
    }
}
