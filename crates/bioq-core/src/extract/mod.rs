//! Entity and intent extraction
//!
//! [`Extractor::extract`] normalizes the question, collects spans from every
//! [`EntityRecognizer`], resolves overlaps and ranks intents with an
//! [`IntentModel`]. Recognizers and intent models are collaborators: the
//! built-in ones are rule based, trained models plug in through the same
//! traits.

mod classifier;
mod lexicon;
mod normalize;
mod overlap;
mod patterns;

pub use classifier::KeywordIntentClassifier;
pub use lexicon::LexiconRecognizer;
pub use normalize::{normalize, NormalizedText, Token};
pub use overlap::resolve_overlaps;
pub use patterns::PatternRecognizer;

use crate::error::QueryError;
use crate::model::{EntitySpan, IntentKind, RankedIntent};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Produces typed spans over normalized text
pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, text: &NormalizedText) -> Vec<EntitySpan>;
}

/// Ranks intents for a whole question
pub trait IntentModel: Send + Sync {
    fn classify(&self, text: &NormalizedText) -> Vec<RankedIntent>;
}

/// Output of the extraction stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub text: NormalizedText,
    /// Non-overlapping spans sorted by start offset
    pub spans: Vec<EntitySpan>,
    /// Never empty; the first entry is the draft intent
    pub intents: Vec<RankedIntent>,
}

impl Extraction {
    pub fn draft_intent(&self) -> IntentKind {
        self.intents
            .first()
            .map(|ranked| ranked.intent)
            .unwrap_or(IntentKind::Lookup)
    }
}

pub struct Extractor {
    recognizers: Vec<Arc<dyn EntityRecognizer>>,
    intent_model: Arc<dyn IntentModel>,
}

impl Extractor {
    pub fn new(recognizers: Vec<Arc<dyn EntityRecognizer>>, intent_model: Arc<dyn IntentModel>) -> Self {
        Self {
            recognizers,
            intent_model,
        }
    }

    #[instrument(skip(self), fields(recognizers = self.recognizers.len()))]
    pub fn extract(&self, raw: &str) -> Result<Extraction, QueryError> {
        let text = normalize(raw)?;
        let char_len = text.char_len();

        let mut spans = Vec::new();
        for recognizer in &self.recognizers {
            for mut span in recognizer.recognize(&text) {
                if span.is_empty() || span.end > char_len || !span.confidence.is_finite() {
                    warn!(recognizer = recognizer.name(), span = %span, "dropping out-of-range span");
                    continue;
                }
                span.surface = text.slice(span.start, span.end);
                spans.push(span);
            }
        }

        let spans = resolve_overlaps(spans);
        let intents = sanitize_ranking(self.intent_model.classify(&text));

        debug!(
            spans = spans.len(),
            draft = %intents.first().map(|r| r.intent).unwrap_or(IntentKind::Lookup),
            "extraction finished"
        );

        Ok(Extraction { text, spans, intents })
    }
}

/// Deduplicate, clamp and order a model's ranking; an empty ranking
/// becomes a single low-confidence lookup
pub(crate) fn sanitize_ranking(raw: Vec<RankedIntent>) -> Vec<RankedIntent> {
    let mut ranking: Vec<RankedIntent> = Vec::new();
    for entry in raw.into_iter().filter(|r| r.confidence.is_finite()) {
        let entry = RankedIntent::new(entry.intent, entry.confidence);
        match ranking.iter_mut().find(|r| r.intent == entry.intent) {
            Some(existing) if existing.confidence < entry.confidence => *existing = entry,
            Some(_) => {},
            None => ranking.push(entry),
        }
    }

    ranking.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.intent.cmp(&b.intent))
    });

    if ranking.is_empty() {
        ranking.push(RankedIntent::new(IntentKind::Lookup, 0.5));
    }
    ranking
}
