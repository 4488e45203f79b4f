use super::normalize::NormalizedText;
use super::EntityRecognizer;
use crate::model::{EntityKind, EntitySpan};
use crate::ontology::OntologySnapshot;
use std::collections::BTreeMap;
use std::sync::Arc;

const EXACT_CASE_CONFIDENCE: f64 = 0.95;
const CASE_INSENSITIVE_CONFIDENCE: f64 = 0.90;
const MAX_NGRAM: usize = 5;

/// Single words never looked up on their own
const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "between", "by", "do", "does", "find",
    "for", "from", "gene", "genes", "get", "how", "in", "into", "is", "it", "me", "of", "on",
    "or", "protein", "proteins", "show", "tell", "the", "to", "what", "where", "which", "who",
    "with",
];

/// Looks up word n-grams in the snapshot's label and synonym index
pub struct LexiconRecognizer {
    snapshot: Arc<OntologySnapshot>,
}

impl LexiconRecognizer {
    pub fn new(snapshot: Arc<OntologySnapshot>) -> Self {
        Self { snapshot }
    }
}

impl EntityRecognizer for LexiconRecognizer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn recognize(&self, text: &NormalizedText) -> Vec<EntitySpan> {
        let mut spans = Vec::new();

        for (i, first) in text.tokens.iter().enumerate() {
            for width in 1..=MAX_NGRAM {
                let Some(last) = text.tokens.get(i + width - 1) else {
                    break;
                };
                if width == 1 && STOP_WORDS.contains(&first.text.to_lowercase().as_str()) {
                    continue;
                }

                let surface = text.slice(first.start, last.end);
                let hits = self.snapshot.term_hits(&surface);
                if hits.is_empty() {
                    continue;
                }

                // One span per entity kind, scored by its best hit
                let mut best: BTreeMap<EntityKind, f64> = BTreeMap::new();
                for hit in hits {
                    let Some(node) = self.snapshot.get(hit.node) else {
                        continue;
                    };
                    let score = if hit.surface == surface {
                        EXACT_CASE_CONFIDENCE
                    } else {
                        CASE_INSENSITIVE_CONFIDENCE
                    };
                    let entry = best.entry(node.source.entity_kind()).or_insert(score);
                    if score > *entry {
                        *entry = score;
                    }
                }

                for (kind, confidence) in best {
                    spans.push(EntitySpan::new(&surface, first.start, last.end, kind, confidence));
                }
            }
        }

        spans
    }
}
