//! Common test utilities for bioq-core integration tests
//!
//! Fixtures live in `tests/fixtures/`:
//!
//! - `snapshot.json`: a small ontology snapshot (human, mouse, rat and
//!   zebrafish; TP53/Trp53, BRCA1/Brca1, INS, EGFR, MDM2; a few GO terms,
//!   one chemical and two diseases)
//! - `responses.json`: recorded service responses for the replay client
//! - `benchmark_cases.json`: labelled benchmark questions

#![allow(dead_code)]

use anyhow::{Context, Result};
use bioq_core::aggregate::ReplayClient;
use bioq_core::ontology::{load_snapshot_file, OntologyStore};
use bioq_core::{EngineConfig, QueryEngine};
use std::path::PathBuf;
use std::sync::Arc;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn store() -> Result<Arc<OntologyStore>> {
    let config = EngineConfig::default();
    let snapshot = load_snapshot_file(fixture_path("snapshot.json"), &config.active_sources)
        .context("Failed to load fixture snapshot")?;
    Ok(Arc::new(OntologyStore::new(snapshot)))
}

pub fn recorded_client() -> Result<Arc<ReplayClient>> {
    let client = ReplayClient::from_file(fixture_path("responses.json"))
        .context("Failed to load fixture responses")?;
    Ok(Arc::new(client))
}

/// Engine over the fixture snapshot answering from `client`
pub fn engine_with(client: Arc<ReplayClient>, config: EngineConfig) -> Result<QueryEngine> {
    Ok(QueryEngine::new(store()?, config, client)?)
}

/// Engine over the fixture snapshot and recorded responses
pub fn engine() -> Result<QueryEngine> {
    engine_with(recorded_client()?, EngineConfig::default())
}
