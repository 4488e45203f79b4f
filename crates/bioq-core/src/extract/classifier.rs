//! Keyword intent model
//!
//! Each intent has phrase patterns worth 3 points and keyword stems worth 1.
//! Confidence is an intent's share of all points scored.

use super::normalize::NormalizedText;
use super::IntentModel;
use crate::model::{IntentKind, RankedIntent};
use regex::Regex;
use std::sync::LazyLock;

const PHRASE_WEIGHT: u32 = 3;
const KEYWORD_WEIGHT: u32 = 1;

struct IntentRules {
    intent: IntentKind,
    phrases: Vec<Regex>,
    keywords: Vec<Regex>,
}

#[allow(clippy::expect_used)]
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!(r"(?i)\b{}\b", p)).expect("valid intent pattern"))
        .collect()
}

static RULES: LazyLock<Vec<IntentRules>> = LazyLock::new(|| {
    vec![
        IntentRules {
            intent: IntentKind::Lookup,
            phrases: compile(&[
                r"what (?:is|are)",
                r"tell me about",
                r"information (?:on|about)",
                r"show me",
                r"look up",
            ]),
            keywords: compile(&[r"find", r"info\w*", r"describe", r"details?", r"summary"]),
        },
        IntentRules {
            intent: IntentKind::Homology,
            phrases: compile(&[
                r"homolog(?:ue)?s? of",
                r"ortholog(?:ue)?s? of",
                r"paralog(?:ue)?s? of",
                r"counterparts? of",
                r"equivalent of",
                r"version of",
            ]),
            keywords: compile(&[
                r"homolog\w*",
                r"ortholog\w*",
                r"paralog\w*",
                r"counterpart\w*",
                r"equivalent",
                r"version",
                r"conserved",
            ]),
        },
        IntentRules {
            intent: IntentKind::Interaction,
            phrases: compile(&[
                r"interacts? with",
                r"binds? to",
                r"binding partners?",
                r"interaction partners?",
            ]),
            keywords: compile(&[r"interact\w*", r"bind\w*", r"partners?", r"complex"]),
        },
        IntentRules {
            intent: IntentKind::Comparison,
            phrases: compile(&[r"compare", r"versus", r"vs", r"differences? between"]),
            keywords: compile(&[r"compar\w*", r"differ\w*", r"similar\w*"]),
        },
        IntentRules {
            intent: IntentKind::Annotation,
            phrases: compile(&[
                r"function of",
                r"role of",
                r"what does",
                r"involved in",
                r"pathways?",
            ]),
            keywords: compile(&[
                r"function\w*",
                r"role",
                r"express\w*",
                r"process\w*",
                r"annotat\w*",
                r"go terms?",
            ]),
        },
        IntentRules {
            intent: IntentKind::Unsupported,
            phrases: compile(&[
                r"sequence of",
                r"dna sequence",
                r"protein sequence",
                r"blast",
                r"align\w*",
                r"structure of",
                r"3d structure",
            ]),
            keywords: compile(&[r"sequenc\w*", r"fasta", r"pdb"]),
        },
    ]
});

/// Rule-based [`IntentModel`] over phrase and keyword patterns
#[derive(Debug, Default, Clone)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Raw points per intent, in intent order
    pub fn scores(&self, text: &str) -> Vec<(IntentKind, u32)> {
        RULES
            .iter()
            .map(|rules| {
                let phrases = rules.phrases.iter().filter(|p| p.is_match(text)).count() as u32;
                let keywords = rules.keywords.iter().filter(|k| k.is_match(text)).count() as u32;
                (rules.intent, phrases * PHRASE_WEIGHT + keywords * KEYWORD_WEIGHT)
            })
            .collect()
    }
}

impl IntentModel for KeywordIntentClassifier {
    fn classify(&self, text: &NormalizedText) -> Vec<RankedIntent> {
        let scores = self.scores(&text.text);
        let total: u32 = scores.iter().map(|(_, score)| score).sum();
        if total == 0 {
            return vec![RankedIntent::new(IntentKind::Lookup, 0.5)];
        }

        let mut ranking: Vec<RankedIntent> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0)
            .map(|(intent, score)| RankedIntent::new(intent, f64::from(score) / f64::from(total)))
            .collect();

        ranking.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.intent.cmp(&b.intent))
        });
        ranking
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extract::normalize;

    fn rank(text: &str) -> Vec<RankedIntent> {
        KeywordIntentClassifier::new().classify(&normalize(text).unwrap())
    }

    #[test]
    fn test_homology_question() {
        let ranking = rank("find mouse homologs of TP53");
        assert_eq!(ranking[0].intent, IntentKind::Homology);
        assert_eq!(ranking[1].intent, IntentKind::Lookup);
        assert!((ranking[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_annotation_question() {
        assert_eq!(rank("what does p53 do")[0].intent, IntentKind::Annotation);
        assert_eq!(
            rank("What is the function of TP53 gene?")[0].intent,
            IntentKind::Annotation
        );
    }

    #[test]
    fn test_interaction_and_comparison() {
        assert_eq!(rank("What proteins interact with TP53?")[0].intent, IntentKind::Interaction);
        assert_eq!(rank("compare BRCA1 and BRCA2")[0].intent, IntentKind::Comparison);
    }

    #[test]
    fn test_sequence_requests_are_unsupported() {
        assert_eq!(
            rank("Get the DNA sequence of insulin gene")[0].intent,
            IntentKind::Unsupported
        );
    }

    #[test]
    fn test_no_signal_defaults_to_lookup() {
        assert_eq!(rank("TP53"), vec![RankedIntent::new(IntentKind::Lookup, 0.5)]);
    }

    #[test]
    fn test_confidences_sum_to_one() {
        let total: f64 = rank("compare the function of TP53 and its mouse homolog")
            .iter()
            .map(|r| r.confidence)
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
