//! `bioq ontology` command implementation

use crate::config::Settings;
use crate::error::Result;
use crate::output::{self, new_table, OutputFormat};
use bioq_core::ontology::{OntologySnapshot, SnapshotStats, SnapshotVersion, TermKind};
use colored::Colorize;
use serde::Serialize;

/// One lookup match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupRow {
    pub id: String,
    pub label: String,
    pub source: String,
    /// How the term matched: id, label or synonym
    pub matched: &'static str,
    pub surface: String,
}

#[derive(Serialize)]
struct StatsView<'a> {
    version: &'a SnapshotVersion,
    stats: &'a SnapshotStats,
}

pub async fn stats(settings: &Settings, format: OutputFormat) -> Result<()> {
    let config = settings.engine_config()?;
    let store = settings.load_store(&config)?;
    let snapshot = store.snapshot();
    let stats = snapshot.stats();

    match format {
        OutputFormat::Table => print!("{}", output::render_stats(snapshot.version(), &stats)),
        OutputFormat::Json => output::print_json(&StatsView {
            version: snapshot.version(),
            stats: &stats,
        })?,
    }
    Ok(())
}

pub async fn lookup(settings: &Settings, term: &str, format: OutputFormat) -> Result<()> {
    let config = settings.engine_config()?;
    let store = settings.load_store(&config)?;
    let rows = find(&store.snapshot(), term);

    match format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Table if rows.is_empty() => {
            println!("{} No ontology record matches '{}'", "!".yellow(), term);
        },
        OutputFormat::Table => {
            let mut table = new_table(["Id", "Label", "Source", "Matched", "Term"]);
            for row in &rows {
                table.add_row(vec![
                    row.id.clone(),
                    row.label.clone(),
                    row.source.clone(),
                    row.matched.to_string(),
                    row.surface.clone(),
                ]);
            }
            println!("{}", table);
        },
    }
    Ok(())
}

/// Exact id match first, then label and synonym hits in index order
pub fn find(snapshot: &OntologySnapshot, term: &str) -> Vec<LookupRow> {
    let term = term.trim();
    let mut rows = Vec::new();

    if let Some(node) = snapshot.by_id(term) {
        rows.push(LookupRow {
            id: node.id.clone(),
            label: node.label.clone(),
            source: node.source.to_string(),
            matched: "id",
            surface: node.id.clone(),
        });
    }

    for hit in snapshot.term_hits(term) {
        let Some(node) = snapshot.get(hit.node) else {
            continue;
        };
        rows.push(LookupRow {
            id: node.id.clone(),
            label: node.label.clone(),
            source: node.source.to_string(),
            matched: match hit.kind {
                TermKind::Label => "label",
                TermKind::Synonym => "synonym",
            },
            surface: hit.surface.clone(),
        });
    }
    rows
}
