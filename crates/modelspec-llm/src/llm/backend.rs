use std::num::NonZeroU32;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{bail, Result};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel};
use llama_cpp_2::token::LlamaToken;
use modelspec_core::config::{InferenceConfig, SamplingConfig};
use modelspec_core::interfaces::{
    EncodedInput, GenerationParams, Generator, TokenId, TokenSequence, Tokenizer,
};

use super::sampling::Strategy;

/// Global llama.cpp backend, initialized once and never freed until process exit.
/// llama_backend_init() is a global operation; calling it twice or freeing it
/// while models are live causes crashes.
static LLAMA_BACKEND: OnceLock<Result<LlamaBackend, String>> = OnceLock::new();

fn get_or_init_backend() -> Result<&'static LlamaBackend> {
    LLAMA_BACKEND
        .get_or_init(|| LlamaBackend::init().map_err(|e| format!("{e:?}")))
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to init llama backend: {e}"))
}

fn load_model(path: &Path, n_gpu_layers: u32) -> Result<LlamaModel> {
    let backend = get_or_init_backend()?;
    let model_params = LlamaModelParams::default().with_n_gpu_layers(n_gpu_layers);
    LlamaModel::load_from_file(backend, path, &model_params)
        .map_err(|e| anyhow::anyhow!("Failed to load model {}: {:?}", path.display(), e))
}

/// Tokenizer half of a GGUF checkpoint. The vocabulary is embedded in the
/// weights file, so this loads the file CPU-only.
pub struct LlamaTokenizer {
    model: LlamaModel,
}

impl LlamaTokenizer {
    pub fn load(path: &Path) -> Result<Self> {
        let model = load_model(path, 0)?;
        tracing::debug!("Tokenizer loaded: {} tokens in vocab", model.n_vocab());
        Ok(Self { model })
    }
}

impl Tokenizer for LlamaTokenizer {
    fn encode(&self, text: &str) -> Result<EncodedInput> {
        let tokens = self
            .model
            .str_to_token(text, AddBos::Always)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {:?}", e))?;
        Ok(EncodedInput::from_ids(tokens.into_iter().map(|t| t.0).collect()))
    }

    /// Special tokens are rendered, not skipped.
    fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        let mut decoder = encoding_rs::UTF_8.new_decoder();
        decode_pieces(tokens, |id| {
            self.model
                .token_to_piece(LlamaToken(id), &mut decoder, true, None)
        })
    }
}

/// Concatenate the piece for each token, failing on the first token that
/// has none.
fn decode_pieces<E: std::fmt::Debug>(
    tokens: &[TokenId],
    mut piece: impl FnMut(TokenId) -> std::result::Result<String, E>,
) -> Result<String> {
    let mut output = String::new();
    for &id in tokens {
        match piece(id) {
            Ok(text) => output.push_str(&text),
            Err(e) => bail!("Failed to decode token {id}: {e:?}"),
        }
    }
    Ok(output)
}

/// Generative half of a GGUF checkpoint.
pub struct LlamaCppModel {
    model: LlamaModel,
    n_ctx: u32,
    n_batch: u32,
    strategy: Strategy,
}

impl LlamaCppModel {
    /// Load a GGUF model file. `inference.n_gpu_layers` controls GPU offload (99 = all layers).
    pub fn load(
        path: &Path,
        inference: &InferenceConfig,
        sampling: &SamplingConfig,
    ) -> Result<Self> {
        let model = load_model(path, inference.n_gpu_layers)?;
        Ok(Self {
            model,
            n_ctx: inference.n_ctx,
            n_batch: inference.n_batch,
            strategy: Strategy::from_config(sampling),
        })
    }

    pub fn is_end_of_generation(&self, id: TokenId) -> bool {
        self.model.is_eog_token(LlamaToken(id))
    }
}

impl Generator for LlamaCppModel {
    /// Returns a single sequence: the prompt followed by the continuation,
    /// never longer than `max_length` in total. An end-of-generation token
    /// is kept and ends the sequence.
    fn generate(
        &mut self,
        input: &EncodedInput,
        params: &GenerationParams,
    ) -> Result<Vec<TokenSequence>> {
        if input.is_empty() {
            bail!("Cannot generate from an empty input");
        }

        let mut sequence: TokenSequence = input.input_ids.clone();
        let budget = new_token_budget(sequence.len(), params.max_length);
        if budget == 0 {
            tracing::warn!(
                "Input length {} already reaches max_length {}; nothing generated",
                sequence.len(),
                params.max_length
            );
            return Ok(vec![sequence]);
        }

        let backend = get_or_init_backend()?;
        let prompt_len = u32::try_from(sequence.len())?;
        let batch_size = self.n_batch.max(prompt_len);
        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(NonZeroU32::new(self.n_ctx.max(params.max_length)))
            .with_n_batch(batch_size);

        let mut ctx = self
            .model
            .new_context(backend, ctx_params)
            .map_err(|e| anyhow::anyhow!("Failed to create context: {:?}", e))?;

        let mut batch = LlamaBatch::new(batch_size as usize, 1);
        let last_index = sequence.len() as i32 - 1;
        for (i, &id) in (0_i32..).zip(sequence.iter()) {
            batch
                .add(LlamaToken(id), i, &[0], i == last_index)
                .map_err(|e| anyhow::anyhow!("Batch add failed: {:?}", e))?;
        }

        ctx.decode(&mut batch)
            .map_err(|e| anyhow::anyhow!("Initial decode failed: {:?}", e))?;

        let mut sampler = self.strategy.sampler();
        let mut n_cur = batch.n_tokens();

        for step in 1..=budget {
            let token = sampler.sample(&ctx, batch.n_tokens() - 1);
            sampler.accept(token);
            sequence.push(token.0);

            if self.is_end_of_generation(token.0) {
                tracing::debug!("End of generation after {} new tokens", step);
                break;
            }
            if step == budget {
                break;
            }

            batch.clear();
            batch
                .add(token, n_cur, &[0], true)
                .map_err(|e| anyhow::anyhow!("Batch add failed: {:?}", e))?;
            n_cur += 1;

            ctx.decode(&mut batch)
                .map_err(|e| anyhow::anyhow!("Decode failed: {:?}", e))?;
        }

        Ok(vec![sequence])
    }
}

/// New tokens allowed when `max_length` bounds the total sequence length.
fn new_token_budget(prompt_len: usize, max_length: u32) -> usize {
    (max_length as usize).saturating_sub(prompt_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_counts_prompt_tokens() {
        assert_eq!(new_token_budget(5, 64), 59);
        assert_eq!(new_token_budget(64, 64), 0);
        assert_eq!(new_token_budget(80, 64), 0);
        assert_eq!(new_token_budget(1, 0), 0);
    }

    #[test]
    fn decode_joins_pieces_in_order() {
        let text = decode_pieces(&[2, 7, 9], |id| Ok::<_, ()>(format!("<{id}>"))).unwrap();
        assert_eq!(text, "<2><7><9>");
    }

    #[test]
    fn undecodable_token_fails_the_decode() {
        let mut seen = Vec::new();
        let err = decode_pieces(&[2, 99, 9], |id| {
            seen.push(id);
            if id == 99 {
                Err("unknown token type")
            } else {
                Ok("ok".to_string())
            }
        })
        .unwrap_err();

        assert!(err.to_string().contains("Failed to decode token 99"), "got {err}");
        assert_eq!(seen, vec![2, 99], "Decoding stops at the failing token");
    }
}
