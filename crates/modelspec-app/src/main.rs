mod cli;

use anyhow::Result;
use clap::Parser;
use modelspec_core::config::AppConfig;
use modelspec_core::{lifecycle, run_example};
use modelspec_llm::LlamaResolver;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    lifecycle::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());

    match &cli.command {
        Some(Commands::List) => {
            let store = config.store.open();
            tracing::debug!("Listing models in {}", store.root().display());
            for model in store.list()? {
                println!("{model}");
            }
        }
        None => {
            let request = cli.run_request(config.run.clone());
            tracing::debug!(
                "Running {} with max_length {}",
                request.model,
                request.max_length
            );
            let resolver = LlamaResolver::from_config(&config);
            let output = run_example(&resolver, &request)?;
            println!("{output}");
        }
    }

    Ok(())
}
