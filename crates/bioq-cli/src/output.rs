//! Terminal rendering for plans, results and reports

use crate::error::Result;
use bioq_core::evaluation::BenchmarkReport;
use bioq_core::model::{CallOutcome, SlotOrigin, SlotValue};
use bioq_core::ontology::{SnapshotStats, SnapshotVersion};
use bioq_core::{QueryPlan, ResolvedResult, ResultStatus, SemanticFrame};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;
use std::fmt::Write;

/// Longest fact rendering shown in a table cell
const MAX_CELL_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A table with the CLI's standard look
pub fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

pub fn render_frame(frame: &SemanticFrame) -> String {
    let mut out = String::new();
    let confidence = frame
        .ranked_intents
        .iter()
        .find(|ranked| ranked.intent == frame.intent)
        .map(|ranked| ranked.confidence)
        .unwrap_or(0.0);

    let _ = writeln!(out, "{:<10} {}", "Question:".bold(), frame.text);
    let _ = writeln!(out, "{:<10} {} ({:.2})", "Intent:".bold(), frame.intent.to_string().cyan(), confidence);
    if frame.is_complete() {
        let _ = writeln!(out, "{:<10} {}", "Frame:".bold(), "complete".green());
    } else {
        let missing: Vec<String> = frame.missing_slots().iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{:<10} {} (missing: {})",
            "Frame:".bold(),
            "incomplete".yellow(),
            missing.join(", ")
        );
    }
    let _ = writeln!(out, "{:<10} {}", "Snapshot:".bold(), frame.snapshot_version);

    if !frame.slots.is_empty() {
        let mut slots = new_table(["Slot", "Value", "Origin"]);
        for (name, fill) in &frame.slots {
            let value = match &fill.value {
                SlotValue::Entity(entity) => format!("{} ({})", entity.display_name, entity.ontology_id),
                SlotValue::Literal(value) => value.clone(),
            };
            slots.add_row(vec![name.to_string(), value, origin_label(fill.origin).to_string()]);
        }
        let _ = writeln!(out, "\n{}", slots);
    }

    if !frame.entities.is_empty() {
        let mut entities = new_table(["Mention", "Id", "Name", "Confidence", "Alternatives"]);
        for entity in &frame.entities {
            let mention = entity
                .mention
                .as_ref()
                .map(|span| span.surface.clone())
                .unwrap_or_default();
            let alternatives: Vec<String> = entity
                .alternative_candidates
                .iter()
                .map(|alt| format!("{} ({:.2})", alt.ontology_id, alt.confidence))
                .collect();
            let confidence = if entity.ambiguous {
                format!("{:.3} ambiguous", entity.resolution_confidence)
            } else {
                format!("{:.3}", entity.resolution_confidence)
            };
            entities.add_row(vec![
                mention,
                entity.ontology_id.clone(),
                entity.display_name.clone(),
                confidence,
                alternatives.join(", "),
            ]);
        }
        let _ = writeln!(out, "{}", entities);
    }

    for unresolved in &frame.unresolved {
        let _ = writeln!(out, "{} no ontology match for {}", "!".yellow(), unresolved.span);
    }
    out
}

pub fn render_plan(plan: &QueryPlan) -> String {
    let mut out = render_frame(&plan.frame);
    let mut table = new_table(["Id", "Call", "Parameters", "Depends on", "Subject"]);
    for descriptor in &plan.descriptors {
        let parameters: Vec<String> = descriptor
            .parameters
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        let depends: Vec<String> = descriptor.depends_on.iter().map(ToString::to_string).collect();
        table.add_row(vec![
            descriptor.id.to_string(),
            descriptor.label(),
            parameters.join("\n"),
            depends.join(", "),
            descriptor.subject.clone(),
        ]);
    }
    let _ = writeln!(out, "\n{}", "Query plan:".bold());
    let _ = writeln!(out, "{}", table);
    render_suggestions(&mut out, &plan.suggestions);
    out
}

fn render_suggestions(out: &mut String, suggestions: &[String]) {
    if suggestions.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}", "You could also ask:".bold());
    for suggestion in suggestions {
        let _ = writeln!(out, "  {}", suggestion);
    }
}

pub fn render_result(result: &ResolvedResult) -> String {
    let mut out = render_frame(&result.frame);
    let _ = writeln!(out, "\n{:<10} {}", "Status:".bold(), status_label(result.status));

    if !result.payload.is_empty() {
        let mut facts = new_table(["Entity", "Fact", "From", "Data"]);
        for (id, fact) in result.payload.facts() {
            facts.add_row(vec![
                id.to_string(),
                fact.kind.clone(),
                fact.source.to_string(),
                truncate(&fact.data.to_string(), MAX_CELL_CHARS),
            ]);
        }
        let _ = writeln!(out, "{}", facts);
    }

    let mut provenance = new_table(["Id", "Call", "Outcome"]);
    for entry in &result.provenance {
        let call = entry
            .call
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| entry.descriptor.label());
        let outcome = match &entry.outcome {
            CallOutcome::Succeeded { digest } => format!("ok {}", digest.short(12)),
            CallOutcome::Failed { failure } => format!("failed: {}", failure),
            CallOutcome::Skipped { reason } => format!("skipped: {}", reason),
        };
        provenance.add_row(vec![entry.descriptor.id.to_string(), call, outcome]);
    }
    let _ = writeln!(out, "{}", "Provenance:".bold());
    let _ = writeln!(out, "{}", provenance);
    render_suggestions(&mut out, &result.suggestions);
    out
}

pub fn render_report(report: &BenchmarkReport) -> String {
    let mut out = String::new();

    let mut cases = new_table(["Case", "Category", "Intent", "Entities", "Resolved", "Confidence"]);
    for outcome in &report.outcomes {
        let intent = match outcome.predicted_intent {
            Some(predicted) if outcome.intent_correct => predicted.to_string(),
            Some(predicted) => format!("{} (expected {})", predicted, outcome.expected_intent),
            None => format!("- (expected {})", outcome.expected_intent),
        };
        let entities = if outcome.entities_correct {
            "ok".to_string()
        } else {
            format!("missing {}", outcome.missing_entities.join(", "))
        };
        cases.add_row(vec![
            outcome.id.clone(),
            outcome.category.clone(),
            intent,
            entities,
            yes_no(outcome.resolved).to_string(),
            format!("{:.3}", outcome.confidence),
        ]);
    }
    let _ = writeln!(out, "{}", cases);

    let mut categories = new_table(["Category", "Cases", "Entities", "Intents", "Resolved"]);
    for (name, stats) in &report.by_category {
        categories.add_row(vec![
            name.clone(),
            stats.cases.to_string(),
            stats.entities_correct.to_string(),
            stats.intents_correct.to_string(),
            stats.resolved.to_string(),
        ]);
    }
    let _ = writeln!(out, "{}", categories);

    let _ = writeln!(out, "{:<26} {}", "Started:".bold(), report.started_at.to_rfc3339());
    let _ = writeln!(out, "{:<26} {}", "Cases:".bold(), report.cases);
    let _ = writeln!(
        out,
        "{:<26} {:.1}% {}",
        "Entity recognition:".bold(),
        report.entity_recognition_rate * 100.0,
        target_label(report.meets_entity_target)
    );
    let _ = writeln!(out, "{:<26} {:.1}%", "Intent accuracy:".bold(), report.intent_accuracy * 100.0);
    let _ = writeln!(
        out,
        "{:<26} {:.1}% {}",
        "Resolved queries:".bold(),
        report.resolved_rate * 100.0,
        target_label(report.meets_resolved_target)
    );
    let _ = writeln!(out, "{:<26} {:.3}", "Average confidence:".bold(), report.average_confidence);
    let _ = writeln!(out, "{:<26} {:.3}", "Overall score:".bold(), report.overall_score);
    out
}

pub fn render_stats(version: &SnapshotVersion, stats: &SnapshotStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<18} {}", "Snapshot:".bold(), version);

    let mut table = new_table(["Source", "Records"]);
    for (source, count) in &stats.records_per_source {
        table.add_row(vec![source.to_string(), count.to_string()]);
    }
    let _ = writeln!(out, "{}", table);

    let _ = writeln!(out, "{:<18} {}", "Records:".bold(), stats.records);
    let _ = writeln!(out, "{:<18} {}", "Hierarchy edges:".bold(), stats.hierarchy_edges);
    let _ = writeln!(out, "{:<18} {}", "Cross-references:".bold(), stats.xref_edges);
    let _ = writeln!(out, "{:<18} {}", "External xrefs:".bold(), stats.external_xrefs);
    let _ = writeln!(out, "{:<18} {}", "Indexed terms:".bold(), stats.terms);
    out
}

pub fn origin_label(origin: SlotOrigin) -> &'static str {
    match origin {
        SlotOrigin::Text => "text",
        SlotOrigin::Hint => "hint",
        SlotOrigin::Inferred => "inferred",
        SlotOrigin::Default => "default",
    }
}

fn status_label(status: ResultStatus) -> String {
    match status {
        ResultStatus::Ok => status.to_string().green().to_string(),
        ResultStatus::Partial => status.to_string().yellow().to_string(),
        ResultStatus::Failed => status.to_string().red().to_string(),
    }
}

fn target_label(met: bool) -> String {
    if met {
        "(target met)".green().to_string()
    } else {
        "(below target)".yellow().to_string()
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}
