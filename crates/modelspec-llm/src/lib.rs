pub mod llm;

pub use llm::{LlamaCppModel, LlamaResolver, LlamaTokenizer};
