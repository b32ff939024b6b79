mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, OutputArgs};
use tweet_harvest::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tweet_harvest=debug" } else { "tweet_harvest=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = HarvestConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Extract { input, column, fetch, bearer_token, paid_plan, output } => {
            if let Some(column) = column {
                config.column = column;
            }
            let save_individual = apply_output(&mut config, &output);

            // The credential is checked before any work is done.
            let token = if fetch {
                let token = bearer_token
                    .or_else(|| std::env::var("X_BEARER_TOKEN").ok())
                    .filter(|t| !t.trim().is_empty())
                    .ok_or(HarvestError::MissingCredential)?;
                Some(token)
            } else {
                None
            };

            let harvester = Harvester::new(config)?.save_individual(save_individual);
            println!("Reading {}", input.display());
            let ids = harvester.extract(&input).await?;
            if ids.is_empty() {
                println!("No post ids found");
                return Ok(());
            }
            println!("Extracted {} unique post ids -> {}", ids.len(), harvester.output().ids_path().display());
            println!("Sample ids:");
            for id in ids.iter().take(5) {
                println!("  {id}");
            }

            let Some(token) = token else { return Ok(()) };
            let plan = if paid_plan { PlanMode::Elevated } else { PlanMode::Constrained };
            let limits = harvester.config().pause_limits();
            let pause = match plan {
                PlanMode::Constrained => limits.constrained,
                PlanMode::Elevated => limits.elevated,
            };
            println!("Fetching posts ({plan} plan, up to {}s between batches)", pause.as_secs());

            let api = XApiClient::new(harvester.config().endpoint.clone(), token)?;
            let summary = harvester.fetch(&api, &ids, plan).await?;
            report(&summary)?;
        }
        Commands::Reprocess { document, output } => {
            let save_individual = apply_output(&mut config, &output);
            let harvester = Harvester::new(config)?.save_individual(save_individual);
            println!("Reprocessing {}", document.display());
            let summary = harvester.reprocess(&document).await?;
            report(&summary)?;
        }
    }
    Ok(())
}

fn apply_output(config: &mut HarvestConfig, output: &OutputArgs) -> bool {
    if let Some(dir) = &output.output_dir {
        config.output_dir = dir.clone();
    }
    !output.no_save_individual
}

fn report(summary: &RunSummary) -> Result<()> {
    println!("{summary}");
    if !summary.is_complete() {
        tracing::warn!(failed = summary.failures.len(), "some batches failed; rerun with their ids to retry");
    }
    if summary.items_failed > 0 {
        tracing::warn!(failed = summary.items_failed, "some posts could not be written");
    }
    if let Some(err) = &summary.document_error {
        anyhow::bail!("batch document not written: {err}");
    }
    Ok(())
}
