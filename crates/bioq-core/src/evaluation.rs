//! Offline benchmark harness
//!
//! Runs a set of labelled questions through [`QueryEngine::plan`] and scores
//! entity recognition, intent classification and how many questions compile
//! into an executable plan. No service is called.

use crate::engine::QueryEngine;
use crate::model::{IntentKind, RawQuery, SemanticFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Minimum entity recognition rate a release is expected to reach
pub const ENTITY_RECOGNITION_TARGET: f64 = 0.89;
/// Minimum share of questions that must compile into a plan
pub const RESOLVED_QUERY_TARGET: f64 = 0.92;

const ENTITY_WEIGHT: f64 = 0.3;
const INTENT_WEIGHT: f64 = 0.3;
const RESOLVED_WEIGHT: f64 = 0.4;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Failed to read benchmark cases '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid benchmark cases: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCase {
    pub id: String,
    pub question: String,
    pub category: String,
    /// Ids or display names that must all be among the resolved entities
    #[serde(default)]
    pub expected_entities: Vec<String>,
    pub expected_intent: IntentKind,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseOutcome {
    pub id: String,
    pub question: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub found_entities: Vec<String>,
    pub missing_entities: Vec<String>,
    pub entities_correct: bool,
    pub predicted_intent: Option<IntentKind>,
    pub expected_intent: IntentKind,
    pub intent_correct: bool,
    pub resolved: bool,
    pub descriptors: usize,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        self.entities_correct && self.intent_correct && self.resolved
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryStats {
    pub cases: usize,
    pub entities_correct: usize,
    pub intents_correct: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub started_at: DateTime<Utc>,
    pub cases: usize,
    pub entity_recognition_rate: f64,
    pub intent_accuracy: f64,
    pub resolved_rate: f64,
    pub average_confidence: f64,
    pub overall_score: f64,
    pub meets_entity_target: bool,
    pub meets_resolved_target: bool,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub outcomes: Vec<CaseOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct Benchmark {
    cases: Vec<BenchmarkCase>,
}

impl Benchmark {
    pub fn new(cases: Vec<BenchmarkCase>) -> Self {
        Self { cases }
    }

    pub fn from_json(content: &str) -> Result<Self, BenchmarkError> {
        Ok(Self::new(serde_json::from_str(content)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BenchmarkError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BenchmarkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn cases(&self) -> &[BenchmarkCase] {
        &self.cases
    }

    pub fn run(&self, engine: &QueryEngine) -> BenchmarkReport {
        self.run_with_progress(engine, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_case` after every case
    pub fn run_with_progress<F>(&self, engine: &QueryEngine, mut on_case: F) -> BenchmarkReport
    where
        F: FnMut(&CaseOutcome),
    {
        let started_at = Utc::now();
        let outcomes: Vec<CaseOutcome> = self
            .cases
            .iter()
            .map(|case| {
                let outcome = run_case(engine, case);
                on_case(&outcome);
                outcome
            })
            .collect();
        let report = summarize(outcomes, started_at);
        info!(
            cases = report.cases,
            entity_rate = report.entity_recognition_rate,
            intent_accuracy = report.intent_accuracy,
            resolved_rate = report.resolved_rate,
            "benchmark finished"
        );
        report
    }
}

fn run_case(engine: &QueryEngine, case: &BenchmarkCase) -> CaseOutcome {
    let mut raw = RawQuery::new(case.question.clone());
    if let Some(species) = &case.species {
        raw = raw.with_species(species.clone());
    }

    let mut outcome = CaseOutcome {
        id: case.id.clone(),
        question: case.question.clone(),
        category: case.category.clone(),
        difficulty: case.difficulty,
        found_entities: Vec::new(),
        missing_entities: case.expected_entities.clone(),
        entities_correct: false,
        predicted_intent: None,
        expected_intent: case.expected_intent,
        intent_correct: false,
        resolved: false,
        descriptors: 0,
        confidence: 0.0,
        error: None,
    };

    let frame = match engine.interpret(&raw) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(case = %case.id, error = %e, "case failed before planning");
            outcome.error = Some(e.to_string());
            return outcome;
        },
    };

    outcome.found_entities = frame.entities.iter().map(|e| e.ontology_id.clone()).collect();
    outcome.missing_entities = case
        .expected_entities
        .iter()
        .filter(|expected| !mentions(&frame, expected))
        .cloned()
        .collect();
    outcome.entities_correct = outcome.missing_entities.is_empty();
    outcome.predicted_intent = Some(frame.intent);
    outcome.intent_correct = frame.intent == case.expected_intent;
    outcome.confidence = frame_confidence(&frame);

    match engine.plan(&raw) {
        Ok(plan) => {
            outcome.resolved = true;
            outcome.descriptors = plan.descriptors.len();
        },
        Err(e) => outcome.error = Some(e.to_string()),
    }
    outcome
}

fn mentions(frame: &SemanticFrame, expected: &str) -> bool {
    frame.entities.iter().any(|entity| {
        entity.ontology_id.eq_ignore_ascii_case(expected)
            || entity.display_name.eq_ignore_ascii_case(expected)
            || entity
                .mention
                .as_ref()
                .is_some_and(|span| span.surface.eq_ignore_ascii_case(expected))
    })
}

/// Top intent confidence scaled by the mean entity confidence
fn frame_confidence(frame: &SemanticFrame) -> f64 {
    let intent = frame
        .ranked_intents
        .first()
        .map(|ranked| ranked.confidence)
        .unwrap_or(0.0);
    if frame.entities.is_empty() {
        return intent;
    }
    let mean = frame
        .entities
        .iter()
        .map(|e| e.resolution_confidence)
        .sum::<f64>()
        / frame.entities.len() as f64;
    intent * mean
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn summarize(outcomes: Vec<CaseOutcome>, started_at: DateTime<Utc>) -> BenchmarkReport {
    let total = outcomes.len();
    let mut by_category: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for outcome in &outcomes {
        let stats = by_category.entry(outcome.category.clone()).or_default();
        stats.cases += 1;
        stats.entities_correct += usize::from(outcome.entities_correct);
        stats.intents_correct += usize::from(outcome.intent_correct);
        stats.resolved += usize::from(outcome.resolved);
    }

    let entity_recognition_rate = ratio(outcomes.iter().filter(|o| o.entities_correct).count(), total);
    let intent_accuracy = ratio(outcomes.iter().filter(|o| o.intent_correct).count(), total);
    let resolved_rate = ratio(outcomes.iter().filter(|o| o.resolved).count(), total);
    let average_confidence = if total == 0 {
        0.0
    } else {
        outcomes.iter().map(|o| o.confidence).sum::<f64>() / total as f64
    };

    BenchmarkReport {
        started_at,
        cases: total,
        entity_recognition_rate,
        intent_accuracy,
        resolved_rate,
        average_confidence,
        overall_score: entity_recognition_rate * ENTITY_WEIGHT
            + intent_accuracy * INTENT_WEIGHT
            + resolved_rate * RESOLVED_WEIGHT,
        meets_entity_target: entity_recognition_rate >= ENTITY_RECOGNITION_TARGET,
        meets_resolved_target: resolved_rate >= RESOLVED_QUERY_TARGET,
        by_category,
        outcomes,
    }
}
