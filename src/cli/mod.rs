use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod errors;
mod handlers;
mod types;
mod validation;

pub use handlers::*;
pub use types::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import level word lists, skipping duplicates
    Import {
        /// Level to import
        #[clap(short, long, value_enum, default_value = "all")]
        level: LevelArg,

        /// Delete every existing word before importing
        #[clap(long, default_value = "false")]
        clear: bool,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,

        /// Directory with {level}-words.ts / {level}-words.json files
        #[clap(long)]
        data_dir: Option<PathBuf>,

        /// Similarity threshold for this run
        #[clap(short, long)]
        threshold: Option<f32>,
    },
    /// Generate embeddings for words that have none
    Embed {
        /// Only (re)generate the embedding of this word
        #[clap(long)]
        word_id: Option<u64>,
    },
    /// Find words by meaning
    Search {
        query: String,

        /// Max number of results
        #[clap(short, long)]
        limit: Option<usize>,
    },
    /// Check whether a word would be accepted, without saving it
    Check {
        #[clap(short, long)]
        writing: String,

        #[clap(short, long)]
        reading: String,

        #[clap(short, long)]
        meaning: String,

        /// Similarity threshold for this check
        #[clap(short, long)]
        threshold: Option<f32>,

        /// Print only `true` or `false`
        #[clap(short, long, default_value = "false")]
        quiet: bool,
    },
    /// Print the similarity threshold, or save a new one
    Threshold { value: Option<f32> },
}
