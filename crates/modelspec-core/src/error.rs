use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("invalid model reference {0:?}: repository name is required")]
    MissingName(String),

    #[error("invalid model reference {0:?}: ':' (colon) is not allowed in tag names")]
    ColonInTag(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error(transparent)]
    InvalidReference(#[from] ReferenceError),

    #[error("no GGUF weights file in {0}")]
    WeightsNotFound(String),

    #[error("manifest for {model} has no weights layer")]
    NoWeightsLayer { model: String },

    #[error("unsupported weights for {model}: {reason}")]
    UnsupportedWeights { model: String, reason: String },

    #[error("digest mismatch: want {want}, got {got}")]
    DigestMismatch { want: String, got: String },

    #[error("invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the run pipeline that are not owned by a collaborator.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("generation returned no sequences")]
    EmptyGeneration,
}
