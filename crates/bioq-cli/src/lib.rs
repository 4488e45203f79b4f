//! BioQ CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line interface for the BioQ semantic query resolution engine.
//!
//! # Overview
//!
//! - **Planning**: Show how a question is understood and which calls it compiles to (`bioq plan`)
//! - **Answering**: Execute the plan against recorded service responses (`bioq answer`)
//! - **Ontology**: Inspect the loaded snapshot (`bioq ontology stats/lookup`)
//! - **Benchmark**: Score the engine on a labelled question set (`bioq benchmark`)
//! - **Configuration**: Show and validate engine settings (`bioq config`)

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use config::Settings;
pub use error::{CliError, Result};
pub use output::OutputFormat;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// BioQ - semantic query resolution for biology questions
#[derive(Parser, Debug)]
#[command(name = "bioq")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Ontology snapshot file (JSON or YAML) [env: BIOQ_ONTOLOGY]
    #[arg(long, global = true, value_name = "FILE")]
    pub ontology: Option<PathBuf>,

    /// Engine configuration file (TOML) [env: BIOQ_CONFIG]
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// File locations for this invocation; `responses` comes from `answer`
    pub fn settings(&self, responses: Option<PathBuf>) -> Settings {
        Settings::resolve(self.ontology.clone(), self.config.clone(), responses)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interpret a question and print its query plan without executing it
    Plan {
        /// The question, e.g. "find mouse homologs of TP53"
        #[arg(required = true, value_name = "TEXT")]
        text: Vec<String>,

        /// Species context for the question (name or NCBITaxon id)
        #[arg(short, long)]
        species: Option<String>,

        /// Previous question in the conversation
        #[arg(long, value_name = "TEXT")]
        prior: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Answer a question by executing its plan against recorded responses
    Answer {
        /// The question, e.g. "find mouse homologs of TP53"
        #[arg(required = true, value_name = "TEXT")]
        text: Vec<String>,

        /// Species context for the question (name or NCBITaxon id)
        #[arg(short, long)]
        species: Option<String>,

        /// Previous question in the conversation
        #[arg(long, value_name = "TEXT")]
        prior: Option<String>,

        /// Recorded service responses (JSON) [env: BIOQ_RESPONSES]
        #[arg(short, long, value_name = "FILE")]
        responses: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Inspect the ontology snapshot
    Ontology {
        #[command(subcommand)]
        command: OntologyCommand,
    },

    /// Run a benchmark case file and report accuracy
    Benchmark {
        /// Benchmark cases (JSON)
        #[arg(long, value_name = "FILE")]
        cases: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Ontology subcommands
#[derive(Subcommand, Debug)]
pub enum OntologyCommand {
    /// Show record and edge counts
    Stats {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Look up an ontology id, label or synonym
    Lookup {
        /// Term to look up, e.g. "p53" or "NCBIGene:7157"
        term: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Check the configuration and exit non-zero when it is invalid
    Validate,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_joins_words() {
        let cli = Cli::try_parse_from([
            "bioq", "plan", "find", "mouse", "homologs", "of", "TP53", "--format", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan { text, format, .. } => {
                assert_eq!(text.join(" "), "find mouse homologs of TP53");
                assert_eq!(format, OutputFormat::Json);
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bioq", "ontology", "stats", "--ontology", "snap.json", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.ontology, Some(PathBuf::from("snap.json")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_benchmark_requires_cases() {
        assert!(Cli::try_parse_from(["bioq", "benchmark"]).is_err());
    }
}
