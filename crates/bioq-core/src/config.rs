//! Engine configuration
//!
//! Values come from defaults, then an optional TOML file, then `BIOQ_*`
//! environment variables (a `.env` file is honoured). The resolver and
//! compiler read this configuration but never change it.

use crate::error::ConfigError;
use crate::model::{IntentKind, SlotName};
use crate::ontology::OntologySource;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Resolution Defaults
// ============================================================================

/// Two candidates within this score distance of the top one are tied.
pub const DEFAULT_TIE_MARGIN: f64 = 0.05;

/// Candidates scoring below this leave the mention unresolved.
pub const DEFAULT_MIN_MATCH_CONFIDENCE: f64 = 0.60;

/// Minimum Jaro-Winkler similarity for a fuzzy term match.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.88;

/// Alternative candidates kept per entity.
pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;

/// Species used when a homology query names no source species (human).
pub const DEFAULT_SPECIES: &str = "NCBITaxon:9606";

/// What to do when a mention stays ambiguous
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Keep all tied candidates on the entity and continue
    #[default]
    Report,
    /// Fail the query with `AmbiguousResolution`
    Reject,
}

impl std::str::FromStr for AmbiguityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "report" => Ok(AmbiguityPolicy::Report),
            "reject" => Ok(AmbiguityPolicy::Reject),
            other => Err(ConfigError::invalid(
                "ambiguity_policy",
                format!("expected 'report' or 'reject', got '{}'", other),
            )),
        }
    }
}

/// Required slots per intent
///
/// Each list may add optional schema slots as required; it may not drop the
/// slots the compiler needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotRequirements {
    pub lookup: Vec<SlotName>,
    pub homology: Vec<SlotName>,
    pub interaction: Vec<SlotName>,
    pub comparison: Vec<SlotName>,
    pub annotation: Vec<SlotName>,
}

impl Default for SlotRequirements {
    fn default() -> Self {
        Self {
            lookup: IntentKind::Lookup.core_required().to_vec(),
            homology: IntentKind::Homology.core_required().to_vec(),
            interaction: IntentKind::Interaction.core_required().to_vec(),
            comparison: IntentKind::Comparison.core_required().to_vec(),
            annotation: IntentKind::Annotation.core_required().to_vec(),
        }
    }
}

impl SlotRequirements {
    pub fn required(&self, intent: IntentKind) -> &[SlotName] {
        match intent {
            IntentKind::Lookup => &self.lookup,
            IntentKind::Homology => &self.homology,
            IntentKind::Interaction => &self.interaction,
            IntentKind::Comparison => &self.comparison,
            IntentKind::Annotation => &self.annotation,
            IntentKind::Unsupported => &[],
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for intent in IntentKind::ALL {
            let required = self.required(intent);
            let key = format!("slot_requirements.{}", intent);

            if let Some(slot) = required.iter().find(|slot| !intent.slots().contains(slot)) {
                return Err(ConfigError::invalid(
                    key,
                    format!("'{}' is not a slot of the {} intent", slot, intent),
                ));
            }
            if let Some(slot) = intent.core_required().iter().find(|slot| !required.contains(slot)) {
                return Err(ConfigError::invalid(
                    key,
                    format!("'{}' cannot be made optional", slot),
                ));
            }
        }
        Ok(())
    }
}

/// Resolution engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub active_sources: Vec<OntologySource>,
    pub tie_margin: f64,
    pub min_match_confidence: f64,
    pub fuzzy_threshold: f64,
    pub max_alternatives: usize,
    pub default_species: String,
    pub ambiguity_policy: AmbiguityPolicy,
    pub slot_requirements: SlotRequirements,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            active_sources: OntologySource::ALL.to_vec(),
            tie_margin: DEFAULT_TIE_MARGIN,
            min_match_confidence: DEFAULT_MIN_MATCH_CONFIDENCE,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            default_species: DEFAULT_SPECIES.to_string(),
            ambiguity_policy: AmbiguityPolicy::Report,
            slot_requirements: SlotRequirements::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `BIOQ_*` environment overrides
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = env_var("BIOQ_TIE_MARGIN") {
            self.tie_margin = parse_f64("BIOQ_TIE_MARGIN", &value)?;
        }
        if let Some(value) = env_var("BIOQ_MIN_MATCH_CONFIDENCE") {
            self.min_match_confidence = parse_f64("BIOQ_MIN_MATCH_CONFIDENCE", &value)?;
        }
        if let Some(value) = env_var("BIOQ_FUZZY_THRESHOLD") {
            self.fuzzy_threshold = parse_f64("BIOQ_FUZZY_THRESHOLD", &value)?;
        }
        if let Some(value) = env_var("BIOQ_DEFAULT_SPECIES") {
            self.default_species = value.trim().to_string();
        }
        if let Some(value) = env_var("BIOQ_ACTIVE_SOURCES") {
            self.active_sources = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().map_err(|e: String| ConfigError::invalid("BIOQ_ACTIVE_SOURCES", e)))
                .collect::<Result<_, _>>()?;
        }
        if let Some(value) = env_var("BIOQ_AMBIGUITY_POLICY") {
            self.ambiguity_policy = value.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_sources.is_empty() {
            return Err(ConfigError::invalid("active_sources", "at least one source must be active"));
        }
        if !(0.0..=0.5).contains(&self.tie_margin) {
            return Err(ConfigError::invalid("tie_margin", "must be between 0.0 and 0.5"));
        }
        if !(self.min_match_confidence > 0.0 && self.min_match_confidence <= 1.0) {
            return Err(ConfigError::invalid("min_match_confidence", "must be in (0.0, 1.0]"));
        }
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(ConfigError::invalid("fuzzy_threshold", "must be in (0.0, 1.0]"));
        }
        if self.max_alternatives == 0 {
            return Err(ConfigError::invalid("max_alternatives", "must be at least 1"));
        }
        if OntologySource::from_id(&self.default_species) != Some(OntologySource::NcbiTaxonomy) {
            return Err(ConfigError::invalid(
                "default_species",
                format!("'{}' is not an NCBITaxon id", self.default_species),
            ));
        }
        self.slot_requirements.validate()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid("config", e.to_string()))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", value)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_KEYS: [&str; 6] = [
        "BIOQ_TIE_MARGIN",
        "BIOQ_MIN_MATCH_CONFIDENCE",
        "BIOQ_FUZZY_THRESHOLD",
        "BIOQ_DEFAULT_SPECIES",
        "BIOQ_ACTIVE_SOURCES",
        "BIOQ_AMBIGUITY_POLICY",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tie_margin, 0.05);
        assert_eq!(config.active_sources.len(), 6);
        assert_eq!(config.slot_requirements.required(IntentKind::Homology).len(), 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
tie_margin = 0.1
ambiguity_policy = "reject"

[slot_requirements]
annotation = ["gene", "go_term"]
"#,
        )
        .unwrap();
        assert_eq!(config.tie_margin, 0.1);
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Reject);
        assert_eq!(config.min_match_confidence, DEFAULT_MIN_MATCH_CONFIDENCE);
        assert_eq!(
            config.slot_requirements.annotation,
            vec![SlotName::Gene, SlotName::GoTerm]
        );
        assert_eq!(config.slot_requirements.lookup, vec![SlotName::Subject]);
        config.validate().unwrap();
    }

    #[test]
    fn test_core_slots_cannot_be_dropped() {
        let mut config = EngineConfig::default();
        config.slot_requirements.homology = vec![SlotName::Gene];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("source_species"));
    }

    #[test]
    fn test_foreign_slot_rejected() {
        let mut config = EngineConfig::default();
        config.slot_requirements.lookup.push(SlotName::Partner);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_species_must_be_taxon() {
        let config = EngineConfig {
            default_species: "NCBIGene:7157".to_string(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("BIOQ_TIE_MARGIN", "0.02");
        std::env::set_var("BIOQ_ACTIVE_SOURCES", "ncbi_gene, ncbi_taxonomy");
        std::env::set_var("BIOQ_AMBIGUITY_POLICY", "REJECT");

        let mut config = EngineConfig::default();
        config.apply_env().unwrap();
        clear_env();

        assert_eq!(config.tie_margin, 0.02);
        assert_eq!(
            config.active_sources,
            vec![OntologySource::NcbiGene, OntologySource::NcbiTaxonomy]
        );
        assert_eq!(config.ambiguity_policy, AmbiguityPolicy::Reject);
    }

    #[test]
    #[serial]
    fn test_env_bad_number() {
        clear_env();
        std::env::set_var("BIOQ_FUZZY_THRESHOLD", "high");
        let mut config = EngineConfig::default();
        let err = config.apply_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains("BIOQ_FUZZY_THRESHOLD"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&rendered).unwrap(), config);
    }
}
