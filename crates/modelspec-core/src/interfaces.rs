//! Contracts between the run pipeline and the inference library.
//!
//! The llama.cpp implementations live in `modelspec-llm`; tests substitute
//! recording fakes.

use anyhow::Result;

pub type TokenId = i32;

/// One generated sequence: prompt ids followed by the continuation.
pub type TokenSequence = Vec<TokenId>;

/// Tokenizer output, the model-ready form of one input string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedInput {
    pub input_ids: Vec<TokenId>,
    /// 1 for every real token. There is no padding for a single input.
    pub attention_mask: Vec<u8>,
}

impl EncodedInput {
    pub fn from_ids(input_ids: Vec<TokenId>) -> Self {
        let attention_mask = vec![1; input_ids.len()];
        Self {
            input_ids,
            attention_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Bounds for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    /// Maximum total sequence length in tokens, prompt included.
    pub max_length: u32,
}

pub trait Tokenizer {
    fn encode(&self, text: &str) -> Result<EncodedInput>;
    fn decode(&self, tokens: &[TokenId]) -> Result<String>;
}

pub trait Generator {
    fn generate(
        &mut self,
        input: &EncodedInput,
        params: &GenerationParams,
    ) -> Result<Vec<TokenSequence>>;
}

/// Turns a model identifier into ready-to-use artifacts.
///
/// The two calls are independent; nothing guarantees they observe the same
/// checkpoint if the store changes in between.
pub trait ArtifactResolver {
    type Tokenizer: Tokenizer;
    type Model: Generator;

    fn resolve_tokenizer(&self, identifier: &str) -> Result<Self::Tokenizer>;
    fn resolve_model(&self, identifier: &str) -> Result<Self::Model>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attention_mask_covers_every_token() {
        let input = EncodedInput::from_ids(vec![2, 15, 99]);
        assert_eq!(input.attention_mask, vec![1, 1, 1]);
        assert_eq!(input.len(), 3);
        assert!(!input.is_empty());
    }
}
