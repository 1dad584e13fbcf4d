use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod import;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod vocabulary;

use app::AppFactory;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args = cli::Args::parse();

    let paths = AppFactory::get_paths()?;
    let mut config = AppFactory::create_config(&paths)?;

    match args.command {
        cli::Command::Threshold { value } => cli::handle_threshold(value, &mut config),

        cli::Command::Import {
            level,
            clear,
            yes,
            data_dir,
            threshold,
        } => {
            let store = AppFactory::create_store(&paths)?;
            cli::handle_import(level, clear, yes, data_dir, threshold, &config, store)
        }

        cli::Command::Embed { word_id } => {
            let store = AppFactory::create_store(&paths)?;
            cli::handle_embed(word_id, &config, store)
        }

        cli::Command::Search { query, limit } => {
            let store = AppFactory::create_store(&paths)?;
            cli::handle_search(query, limit, &config, store)
        }

        cli::Command::Check {
            writing,
            reading,
            meaning,
            threshold,
            quiet,
        } => {
            let store = AppFactory::create_store(&paths)?;
            cli::handle_check(writing, reading, meaning, threshold, quiet, &config, store)
        }
    }
}
