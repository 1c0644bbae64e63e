use std::path::PathBuf;

use clap::{Parser, Subcommand};
use modelspec_core::config::RunConfig;
use modelspec_core::RunRequest;

#[derive(Parser)]
#[command(name = "mdrun", about = "Run a locally stored model on a prompt")]
pub struct Cli {
    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model reference, model directory, or GGUF file
    #[arg(long)]
    pub model: Option<String>,

    /// Text to continue
    #[arg(long)]
    pub prompt: Option<String>,

    /// Maximum total length in tokens, prompt included
    #[arg(long)]
    pub max_length: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List models in the local store
    List,
}

impl Cli {
    /// Flags override the configured run defaults.
    pub fn run_request(&self, defaults: RunConfig) -> RunRequest {
        let mut request = RunRequest::from(defaults);
        if let Some(model) = &self.model {
            request.model = model.clone();
        }
        if let Some(prompt) = &self.prompt {
            request.prompt = prompt.clone();
        }
        if let Some(max_length) = self.max_length {
            request.max_length = max_length;
        }
        request
    }
}
