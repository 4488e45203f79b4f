//! BioQ CLI - Main entry point

use bioq_cli::{Cli, Commands, ConfigCommand, OntologyCommand};
use bioq_common::logging::{init_logging, LogConfig};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Environment files may set BIOQ_* paths and log settings
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging (ignore errors as CLI should work without logging)
    let log_config = LogConfig::for_cli(cli.verbose).unwrap_or_default();
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> bioq_cli::Result<()> {
    match &cli.command {
        Commands::Plan {
            text,
            species,
            prior,
            format,
        } => {
            let settings = cli.settings(None);
            bioq_cli::commands::plan::run(&settings, text, species.clone(), prior.clone(), *format)
                .await
        },

        Commands::Answer {
            text,
            species,
            prior,
            responses,
            format,
        } => {
            let settings = cli.settings(responses.clone());
            bioq_cli::commands::answer::run(&settings, text, species.clone(), prior.clone(), *format)
                .await
        },

        Commands::Ontology { command } => {
            let settings = cli.settings(None);
            match command {
                OntologyCommand::Stats { format } => {
                    bioq_cli::commands::ontology::stats(&settings, *format).await
                },
                OntologyCommand::Lookup { term, format } => {
                    bioq_cli::commands::ontology::lookup(&settings, term, *format).await
                },
            }
        },

        Commands::Benchmark { cases, format } => {
            let settings = cli.settings(None);
            bioq_cli::commands::benchmark::run(&settings, cases, *format).await
        },

        Commands::Config { command } => {
            let settings = cli.settings(None);
            match command {
                ConfigCommand::Show => bioq_cli::commands::config::show(&settings).await,
                ConfigCommand::Validate => bioq_cli::commands::config::validate(&settings).await,
            }
        },
    }
}
