//! Engine facade wiring extraction, resolution, compilation and aggregation

use crate::aggregate::{Aggregator, ServiceClient};
use crate::compile::QueryCompiler;
use crate::config::EngineConfig;
use crate::error::QueryError;
use crate::extract::{
    EntityRecognizer, Extraction, Extractor, IntentModel, KeywordIntentClassifier,
    LexiconRecognizer, PatternRecognizer,
};
use crate::model::{QueryPlan, RawQuery, ResolvedResult, SemanticFrame};
use crate::ontology::{OntologySnapshot, OntologyStore};
use crate::resolve::SemanticResolver;
use crate::suggest::suggest;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Answers questions against a shared ontology store
///
/// Each query pins the store's current snapshot when it starts and uses it
/// for every stage, so a concurrent reload never changes a query midway.
pub struct QueryEngine {
    store: Arc<OntologyStore>,
    config: EngineConfig,
    client: Arc<dyn ServiceClient>,
    intent_model: Arc<dyn IntentModel>,
    recognizers: Vec<Arc<dyn EntityRecognizer>>,
}

impl QueryEngine {
    pub fn new(
        store: Arc<OntologyStore>,
        config: EngineConfig,
        client: Arc<dyn ServiceClient>,
    ) -> Result<Self, QueryError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            client,
            intent_model: Arc::new(KeywordIntentClassifier::new()),
            recognizers: Vec::new(),
        })
    }

    /// Replace the built-in keyword classifier
    pub fn with_intent_model(mut self, model: Arc<dyn IntentModel>) -> Self {
        self.intent_model = model;
        self
    }

    /// Add a recognizer that runs after the lexicon and pattern recognizers
    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizers.push(recognizer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<OntologyStore> {
        &self.store
    }

    fn extractor(&self, snapshot: &Arc<OntologySnapshot>) -> Extractor {
        let mut recognizers: Vec<Arc<dyn EntityRecognizer>> = vec![
            Arc::new(LexiconRecognizer::new(Arc::clone(snapshot))),
            Arc::new(PatternRecognizer::new()),
        ];
        recognizers.extend(self.recognizers.iter().cloned());
        Extractor::new(recognizers, Arc::clone(&self.intent_model))
    }

    /// Extract and resolve; the frame may be incomplete
    pub fn interpret(&self, raw: &RawQuery) -> Result<SemanticFrame, QueryError> {
        let snapshot = self.store.snapshot();
        self.interpret_with(&snapshot, raw)
    }

    fn interpret_with(
        &self,
        snapshot: &Arc<OntologySnapshot>,
        raw: &RawQuery,
    ) -> Result<SemanticFrame, QueryError> {
        let extractor = self.extractor(snapshot);
        let extraction = extractor.extract(&raw.text)?;

        let prior: Option<Extraction> = raw
            .hints
            .prior_turn
            .as_deref()
            .and_then(|text| match extractor.extract(text) {
                Ok(extraction) => Some(extraction),
                Err(e) => {
                    debug!(error = %e, "ignoring unusable prior turn");
                    None
                },
            });

        let resolver = SemanticResolver::new(snapshot, &self.config);
        let context = resolver.context_from_hints(&raw.hints, prior.as_ref());
        resolver.resolve(&extraction, &context)
    }

    /// Dry run: extract, resolve, gate and compile without calling services
    pub fn plan(&self, raw: &RawQuery) -> Result<QueryPlan, QueryError> {
        let snapshot = self.store.snapshot();
        self.plan_with(&snapshot, raw)
    }

    fn plan_with(
        &self,
        snapshot: &Arc<OntologySnapshot>,
        raw: &RawQuery,
    ) -> Result<QueryPlan, QueryError> {
        let frame = self.interpret_with(snapshot, raw)?;

        if !frame.is_complete() {
            warn!(intent = %frame.intent, missing = ?frame.missing_slots(), "frame incomplete");
            return Err(QueryError::IncompleteFrame {
                intent: frame.intent,
                missing: frame.missing_slots().to_vec(),
                attempted: frame.attempted_intents.clone(),
                frame: Box::new(frame),
            });
        }

        let descriptors = QueryCompiler::new(snapshot).compile(&frame)?;
        let suggestions = suggest(&frame, snapshot);
        Ok(QueryPlan {
            frame,
            descriptors,
            suggestions,
        })
    }

    pub async fn answer(&self, raw: &RawQuery) -> Result<ResolvedResult, QueryError> {
        self.answer_with_cancellation(raw, CancellationToken::new())
            .await
    }

    /// Answer a question; `cancel` aborts at the next service call boundary
    pub async fn answer_with_cancellation(
        &self,
        raw: &RawQuery,
        cancel: CancellationToken,
    ) -> Result<ResolvedResult, QueryError> {
        let query_id = Uuid::new_v4();
        let span = info_span!("query", %query_id);

        async {
            let snapshot = self.store.snapshot();
            info!(version = %snapshot.version(), "answering query");

            let plan = self.plan_with(&snapshot, raw)?;
            Aggregator::new(Arc::clone(&self.client))
                .aggregate(plan, &cancel)
                .await
        }
        .instrument(span)
        .await
    }
}
