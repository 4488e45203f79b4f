//! `bioq answer` command implementation
//!
//! Executes the plan against a file of recorded service responses. A
//! `failed` result is printed and then reported as an error so the process
//! exits non-zero.

use super::raw_query;
use crate::config::Settings;
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};
use crate::progress::create_spinner;
use bioq_core::aggregate::ReplayClient;
use bioq_core::ResultStatus;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(
    settings: &Settings,
    text: &[String],
    species: Option<String>,
    prior: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let client = ReplayClient::from_file(settings.responses_path()?)?;
    let engine = settings.build_engine(Arc::new(client))?;
    let raw = raw_query(text, species, prior);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding calls");
                cancel.cancel();
            }
        })
    };

    let spinner = create_spinner("Resolving question...");
    let answered = engine.answer_with_cancellation(&raw, cancel).await;
    spinner.finish_and_clear();
    interrupt.abort();

    let result = answered?;
    info!(status = %result.status, facts = result.payload.fact_count(), "question answered");

    match format {
        OutputFormat::Table => print!("{}", output::render_result(&result)),
        OutputFormat::Json => output::print_json(&result)?,
    }

    if result.status == ResultStatus::Failed {
        let message = match result.into_outcome() {
            Err(e) => e.to_string(),
            Ok(_) => "no terminal call succeeded".to_string(),
        };
        return Err(CliError::query_failed(message));
    }
    Ok(())
}
