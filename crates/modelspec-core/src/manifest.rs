//! Model manifest types (the subset of the v2 model spec this tool reads).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MEDIA_TYPE_MODEL_MANIFEST: &str = "application/vnd.cnai.model.manifest.v2+json";
pub const MEDIA_TYPE_MODEL_WEIGHTS: &str = "application/vnd.cnai.model.weights.v2.tar";

/// Content-addressed reference to a blob in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: String,
    pub digest: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default)]
    pub file: Vec<Descriptor>,
    /// Storage format, e.g. `gguf` or `safetensors`.
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub precision: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub architecture: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub config: ModelConfig,
    #[serde(default)]
    pub processor: Vec<Descriptor>,
    #[serde(default)]
    pub weights: Weights,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    /// First weights layer, the one the runner loads.
    pub fn primary_weights(&self) -> Option<&Descriptor> {
        self.weights.file.first()
    }
}
