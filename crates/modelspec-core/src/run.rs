use anyhow::{Context, Result};

use crate::config::RunConfig;
use crate::error::RunError;
use crate::interfaces::{ArtifactResolver, Generator, GenerationParams, Tokenizer};

/// One invocation: which checkpoint, what to say to it, and the length bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub model: String,
    pub prompt: String,
    pub max_length: u32,
}

impl Default for RunRequest {
    fn default() -> Self {
        RunConfig::default().into()
    }
}

impl From<RunConfig> for RunRequest {
    fn from(cfg: RunConfig) -> Self {
        Self {
            model: cfg.model,
            prompt: cfg.prompt,
            max_length: cfg.max_length,
        }
    }
}

/// Resolve, encode, generate, decode. Any failing step ends the run.
///
/// Both artifacts are resolved on every call; nothing carries over between runs.
pub fn run_example<R: ArtifactResolver>(resolver: &R, request: &RunRequest) -> Result<String> {
    tracing::debug!("Resolving tokenizer for {}", request.model);
    let tokenizer = resolver
        .resolve_tokenizer(&request.model)
        .with_context(|| format!("Failed to load tokenizer for {}", request.model))?;

    tracing::debug!("Resolving model for {}", request.model);
    let mut model = resolver
        .resolve_model(&request.model)
        .with_context(|| format!("Failed to load model {}", request.model))?;

    let input = tokenizer
        .encode(&request.prompt)
        .context("Tokenization failed")?;
    tracing::debug!("Prompt encoded to {} tokens", input.len());

    let params = GenerationParams {
        max_length: request.max_length,
    };
    let outputs = model
        .generate(&input, &params)
        .context("Generation failed")?;

    let first = outputs.first().ok_or(RunError::EmptyGeneration)?;
    tracing::debug!("Decoding sequence of {} tokens", first.len());
    tokenizer.decode(first).context("Decoding failed")
}
