use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Collect post ids from a fact-checking dataset and archive the posts
#[derive(Debug, Parser)]
#[command(name = "tweet-harvest", version)]
#[command(about = "Extract post ids from a CSV of URLs and archive the posts and their media", long_about = None)]
pub struct Cli {
    /// TOML file with run settings
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output directory (defaults to `data`)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not write one directory per post
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_save_individual: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract ids from a CSV table, optionally fetching the posts
    Extract {
        /// Input CSV file with a header row
        #[arg(value_name = "INPUT_CSV")]
        input: PathBuf,

        /// Column holding the URLs
        #[arg(long)]
        column: Option<String>,

        /// Fetch the posts after extracting ids
        #[arg(long = "fetch", action = ArgAction::SetTrue)]
        fetch: bool,

        /// API bearer token (falls back to X_BEARER_TOKEN)
        #[arg(long, value_name = "TOKEN")]
        bearer_token: Option<String>,

        /// Account is on a paid plan: shorter pauses between batches
        #[arg(long, action = ArgAction::SetTrue)]
        paid_plan: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Rebuild per-post directories and media from an existing tweets_data.json
    Reprocess {
        /// Aggregate batch document written by a previous fetch
        #[arg(value_name = "TWEETS_DATA_JSON")]
        document: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}
