pub mod backend;
pub mod resolver;
pub mod sampling;

pub use backend::{LlamaCppModel, LlamaTokenizer};
pub use resolver::LlamaResolver;
