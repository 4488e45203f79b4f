//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod answer;
pub mod benchmark;
pub mod config;
pub mod ontology;
pub mod plan;

use bioq_core::RawQuery;

/// Engine input from the positional words and context flags
pub(crate) fn raw_query(text: &[String], species: Option<String>, prior: Option<String>) -> RawQuery {
    let mut raw = RawQuery::new(text.join(" "));
    if let Some(species) = species {
        raw = raw.with_species(species);
    }
    if let Some(prior) = prior {
        raw = raw.with_prior_turn(prior);
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_query_carries_hints() {
        let words = vec!["what".to_string(), "does".to_string(), "TP53".to_string(), "do".to_string()];
        let raw = raw_query(&words, Some("mouse".to_string()), None);
        assert_eq!(raw.text, "what does TP53 do");
        assert_eq!(raw.hints.species.as_deref(), Some("mouse"));
        assert_eq!(raw.hints.prior_turn, None);
    }
}
