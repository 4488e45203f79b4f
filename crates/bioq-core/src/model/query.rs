use serde::{Deserialize, Serialize};

/// Optional context supplied alongside the question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextHints {
    /// Species the caller is working in, as a CURIE (`NCBITaxon:10090`) or a name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,

    /// Text of the previous question in a conversation. Species mentioned
    /// there act as tie-break context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_turn: Option<String>,
}

/// A question as submitted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuery {
    pub text: String,
    #[serde(default)]
    pub hints: ContextHints,
}

impl RawQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hints: ContextHints::default(),
        }
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.hints.species = Some(species.into());
        self
    }

    pub fn with_prior_turn(mut self, prior: impl Into<String>) -> Self {
        self.hints.prior_turn = Some(prior.into());
        self
    }
}
