//! `bioq benchmark` command implementation
//!
//! Targets are reported alongside the rates; missing them does not fail
//! the command.

use crate::config::Settings;
use crate::error::Result;
use crate::output::{self, OutputFormat};
use crate::progress::create_progress_bar;
use bioq_core::evaluation::Benchmark;
use std::path::Path;
use tracing::info;

pub async fn run(settings: &Settings, cases: &Path, format: OutputFormat) -> Result<()> {
    let benchmark = Benchmark::from_file(cases)?;
    let engine = settings.offline_engine()?;

    let pb = create_progress_bar(benchmark.cases().len() as u64, "Running benchmark cases");
    let report = benchmark.run_with_progress(&engine, |outcome| {
        pb.set_message(outcome.id.clone());
        pb.inc(1);
    });
    pb.finish_and_clear();

    info!(cases = report.cases, score = report.overall_score, "benchmark complete");

    match format {
        OutputFormat::Table => print!("{}", output::render_report(&report)),
        OutputFormat::Json => output::print_json(&report)?,
    }
    Ok(())
}
