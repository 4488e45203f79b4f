//! `bioq config` command implementation
//!
//! Engine settings come from an optional TOML file plus `BIOQ_*`
//! environment overrides.

use crate::config::{user_config_dir, Settings, CONFIG_ENV, ONTOLOGY_ENV, RESPONSES_ENV};
use crate::error::{CliError, Result};
use colored::Colorize;

/// Show the effective configuration
pub async fn show(settings: &Settings) -> Result<()> {
    let config = settings.engine_config()?;

    println!("{}", "BioQ Configuration:".cyan().bold());
    println!();
    println!("{:<12} {}", "ontology:", display_path(settings.ontology.as_deref()));
    println!("{:<12} {}", "config:", display_path(settings.config.as_deref()));
    println!("{:<12} {}", "responses:", display_path(settings.responses.as_deref()));
    if let Some(dir) = user_config_dir() {
        println!("{:<12} {}", "user dir:", dir.display());
    }
    println!();
    println!("{}", "Engine:".cyan());
    print!("{}", config.to_toml()?);
    println!();
    println!("{}", "Environment Variables:".cyan());
    println!("  {:<26} - Ontology snapshot file", ONTOLOGY_ENV);
    println!("  {:<26} - Engine configuration file", CONFIG_ENV);
    println!("  {:<26} - Recorded responses for 'bioq answer'", RESPONSES_ENV);
    println!("  {:<26} - Ambiguity margin between top candidates", "BIOQ_TIE_MARGIN");
    println!("  {:<26} - Lowest accepted match score", "BIOQ_MIN_MATCH_CONFIDENCE");
    println!("  {:<26} - Jaro-Winkler cut-off for fuzzy matches", "BIOQ_FUZZY_THRESHOLD");
    println!("  {:<26} - Fallback species (NCBITaxon id)", "BIOQ_DEFAULT_SPECIES");
    println!("  {:<26} - Comma-separated ontology sources", "BIOQ_ACTIVE_SOURCES");
    println!("  {:<26} - report or reject", "BIOQ_AMBIGUITY_POLICY");
    println!("  {:<26} - Log level (trace..error)", "BIOQ_LOG_LEVEL");

    Ok(())
}

/// Validate the configuration and, when one is configured, the snapshot
pub async fn validate(settings: &Settings) -> Result<()> {
    let config = settings.engine_config()?;
    println!("{} Engine configuration is valid", "✓".green());

    match settings.ontology_path() {
        Ok(_) => {
            let store = settings.load_store(&config)?;
            println!(
                "{} Ontology snapshot {} loaded ({} records)",
                "✓".green(),
                store.snapshot().version(),
                store.snapshot().len()
            );
        },
        Err(CliError::MissingOntology) => {
            println!("{} No ontology snapshot configured; skipped", "ℹ".cyan());
        },
        Err(e) => return Err(e),
    }
    Ok(())
}

fn display_path(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
