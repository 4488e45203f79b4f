//! `bioq plan` command implementation
//!
//! Interprets a question and prints the compiled plan. Nothing is executed.

use super::raw_query;
use crate::config::Settings;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use tracing::info;

pub async fn run(
    settings: &Settings,
    text: &[String],
    species: Option<String>,
    prior: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let engine = settings.offline_engine()?;
    let raw = raw_query(text, species, prior);

    let plan = engine.plan(&raw)?;
    info!(intent = %plan.frame.intent, descriptors = plan.descriptors.len(), "plan compiled");

    match format {
        OutputFormat::Table => print!("{}", output::render_plan(&plan)),
        OutputFormat::Json => output::print_json(&plan)?,
    }
    Ok(())
}
