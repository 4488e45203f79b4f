//! Shape-based recognition: CURIEs, gene-symbol-like tokens, protein
//! shorthand (`p53`) and common species names

use super::normalize::NormalizedText;
use super::EntityRecognizer;
use crate::model::{EntityKind, EntitySpan};
use crate::ontology::OntologySource;
use regex::Regex;
use std::sync::LazyLock;

const CURIE_CONFIDENCE: f64 = 0.99;
const SPECIES_CONFIDENCE: f64 = 0.80;
const SYMBOL_CONFIDENCE: f64 = 0.60;
const PROTEIN_SHORTHAND_CONFIDENCE: f64 = 0.60;

#[allow(clippy::expect_used)]
static CURIE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:GO|CHEBI|NCBITaxon|NCBIGene|DOID|PR):[A-Za-z0-9_]+$").expect("valid CURIE pattern")
});

// Human style (TP53, BRCA1, MYC) or mouse style (Trp53, Brca1)
#[allow(clippy::expect_used)]
static GENE_SYMBOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z][A-Z0-9]{1,9}(?:-[A-Z0-9]+)?|[A-Z][a-z]{1,5}[0-9][0-9a-z]*)$")
        .expect("valid gene symbol pattern")
});

#[allow(clippy::expect_used)]
static PROTEIN_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^p[0-9]{2}$").expect("valid protein shorthand pattern"));

/// All-caps words that look like symbols but name techniques or molecules
const NOT_GENES: &[&str] = &[
    "DNA", "RNA", "MRNA", "CDNA", "GO", "BLAST", "PCR", "PDB", "FASTA", "ID", "IDS", "CDS", "UTR",
    "SNP", "SNPS", "NCBI", "API", "OK",
];

/// Common species names, longest first within each head word
const SPECIES_NAMES: &[&str] = &[
    "house mouse",
    "fruit fly",
    "human",
    "humans",
    "mouse",
    "mice",
    "rat",
    "rats",
    "zebrafish",
    "fly",
    "yeast",
    "chicken",
    "dog",
    "cow",
    "pig",
    "worm",
];

#[derive(Debug, Default, Clone)]
pub struct PatternRecognizer;

impl PatternRecognizer {
    pub fn new() -> Self {
        Self
    }

    fn token_kind(token: &str) -> Option<(EntityKind, f64)> {
        if CURIE.is_match(token) {
            let kind = OntologySource::from_id(token)?.entity_kind();
            return Some((kind, CURIE_CONFIDENCE));
        }
        if PROTEIN_SHORTHAND.is_match(token) {
            return Some((EntityKind::Protein, PROTEIN_SHORTHAND_CONFIDENCE));
        }
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        if GENE_SYMBOL.is_match(token)
            && (has_digit || token.len() >= 3)
            && !NOT_GENES.contains(&token.to_uppercase().as_str())
        {
            return Some((EntityKind::Gene, SYMBOL_CONFIDENCE));
        }
        None
    }
}

impl EntityRecognizer for PatternRecognizer {
    fn name(&self) -> &str {
        "pattern"
    }

    fn recognize(&self, text: &NormalizedText) -> Vec<EntitySpan> {
        let mut spans = Vec::new();

        for token in &text.tokens {
            if let Some((kind, confidence)) = Self::token_kind(&token.text) {
                spans.push(EntitySpan::new(&token.text, token.start, token.end, kind, confidence));
            }
        }

        for (i, token) in text.tokens.iter().enumerate() {
            for width in [2usize, 1] {
                let Some(last) = text.tokens.get(i + width - 1) else {
                    continue;
                };
                let surface = text.slice(token.start, last.end);
                if SPECIES_NAMES.contains(&surface.to_lowercase().as_str()) {
                    spans.push(EntitySpan::new(
                        surface,
                        token.start,
                        last.end,
                        EntityKind::Species,
                        SPECIES_CONFIDENCE,
                    ));
                    break;
                }
            }
        }

        spans
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extract::normalize;

    fn recognize(text: &str) -> Vec<EntitySpan> {
        PatternRecognizer::new().recognize(&normalize(text).unwrap())
    }

    #[test]
    fn test_curie_kinds() {
        let spans = recognize("compare GO:0006915 with CHEBI:15365 and NCBITaxon:10090");
        let kinds: Vec<(String, EntityKind)> =
            spans.iter().map(|s| (s.surface.clone(), s.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("GO:0006915".to_string(), EntityKind::GoTerm),
                ("CHEBI:15365".to_string(), EntityKind::Chemical),
                ("NCBITaxon:10090".to_string(), EntityKind::Species),
            ]
        );
        assert!(spans.iter().all(|s| s.confidence == CURIE_CONFIDENCE));
    }

    #[test]
    fn test_gene_symbols_and_shorthand() {
        let spans = recognize("does Brca1 bind TP53 or p53 in DNA");
        let genes: Vec<&str> = spans
            .iter()
            .filter(|s| s.kind == EntityKind::Gene)
            .map(|s| s.surface.as_str())
            .collect();
        assert_eq!(genes, vec!["Brca1", "TP53"]);
        assert!(spans
            .iter()
            .any(|s| s.surface == "p53" && s.kind == EntityKind::Protein));
    }

    #[test]
    fn test_species_names_prefer_two_words() {
        let spans = recognize("the fruit fly version of MYC in mice");
        let species: Vec<(&str, usize)> = spans
            .iter()
            .filter(|s| s.kind == EntityKind::Species)
            .map(|s| (s.surface.as_str(), s.start))
            .collect();
        assert!(species.contains(&("fruit fly", 4)));
        assert!(species.contains(&("mice", 32)));
    }

    #[test]
    fn test_plain_words_ignored() {
        assert!(recognize("what does it do").is_empty());
    }
}
