//! File locations for BioQ CLI
//!
//! Each path is taken from the command line first, then from the
//! environment, then from the per-user config directory when a file exists
//! there.

use crate::error::{CliError, Result};
use bioq_core::aggregate::{ReplayClient, ServiceClient};
use bioq_core::ontology::OntologyStore;
use bioq_core::{EngineConfig, QueryEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

pub const ONTOLOGY_ENV: &str = "BIOQ_ONTOLOGY";
pub const CONFIG_ENV: &str = "BIOQ_CONFIG";
pub const RESPONSES_ENV: &str = "BIOQ_RESPONSES";

/// File names looked up in the per-user config directory
pub const DEFAULT_ONTOLOGY_FILE: &str = "ontology.json";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Resolved file locations for one CLI invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub ontology: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub responses: Option<PathBuf>,
}

impl Settings {
    /// Combine explicit flags with the environment and user defaults
    pub fn resolve(
        ontology: Option<PathBuf>,
        config: Option<PathBuf>,
        responses: Option<PathBuf>,
    ) -> Self {
        Self {
            ontology: ontology
                .or_else(|| env_path(ONTOLOGY_ENV))
                .or_else(|| user_file(DEFAULT_ONTOLOGY_FILE)),
            config: config
                .or_else(|| env_path(CONFIG_ENV))
                .or_else(|| user_file(DEFAULT_CONFIG_FILE)),
            responses: responses.or_else(|| env_path(RESPONSES_ENV)),
        }
    }

    pub fn ontology_path(&self) -> Result<&Path> {
        let path = self.ontology.as_deref().ok_or(CliError::MissingOntology)?;
        existing(path)
    }

    pub fn responses_path(&self) -> Result<&Path> {
        let path = self.responses.as_deref().ok_or(CliError::MissingResponses)?;
        existing(path)
    }

    /// Effective engine configuration: file, then `BIOQ_*` overrides
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let path = match self.config.as_deref() {
            Some(path) => Some(existing(path)?),
            None => None,
        };
        debug!(config = ?path, "loading engine configuration");
        Ok(EngineConfig::load(path)?)
    }

    pub fn load_store(&self, config: &EngineConfig) -> Result<Arc<OntologyStore>> {
        let path = self.ontology_path()?;
        debug!(ontology = %path.display(), "loading ontology snapshot");
        Ok(Arc::new(OntologyStore::from_file(path, &config.active_sources)?))
    }

    /// Engine over the configured snapshot, executing through `client`
    pub fn build_engine(&self, client: Arc<dyn ServiceClient>) -> Result<QueryEngine> {
        let config = self.engine_config()?;
        let store = self.load_store(&config)?;
        Ok(QueryEngine::new(store, config, client)?)
    }

    /// Engine for commands that never reach an external service
    pub fn offline_engine(&self) -> Result<QueryEngine> {
        let client = ReplayClient::new(Vec::new())?;
        self.build_engine(Arc::new(client))
    }
}

/// Per-user configuration directory, e.g. `~/.config/bioq`
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bioq"))
}

fn user_file(name: &str) -> Option<PathBuf> {
    user_config_dir()
        .map(|dir| dir.join(name))
        .filter(|path| path.is_file())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn existing(path: &Path) -> Result<&Path> {
    if path.exists() {
        Ok(path)
    } else {
        Err(CliError::file_not_found(path.display().to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_flags_win_over_environment() {
        std::env::set_var(ONTOLOGY_ENV, "/from/env.json");
        std::env::set_var(RESPONSES_ENV, "/from/env-responses.json");

        let settings = Settings::resolve(Some(PathBuf::from("/from/flag.json")), None, None);
        assert_eq!(settings.ontology, Some(PathBuf::from("/from/flag.json")));
        assert_eq!(settings.responses, Some(PathBuf::from("/from/env-responses.json")));

        std::env::remove_var(ONTOLOGY_ENV);
        std::env::remove_var(RESPONSES_ENV);
    }

    #[test]
    #[serial]
    fn test_blank_environment_is_ignored() {
        std::env::set_var(RESPONSES_ENV, "  ");
        let settings = Settings::resolve(None, None, None);
        assert_eq!(settings.responses, None);
        std::env::remove_var(RESPONSES_ENV);
    }

    #[test]
    fn test_missing_paths_are_reported() {
        let settings = Settings::default();
        assert!(matches!(settings.ontology_path(), Err(CliError::MissingOntology)));
        assert!(matches!(settings.responses_path(), Err(CliError::MissingResponses)));

        let settings = Settings {
            ontology: Some(PathBuf::from("/definitely/not/here.json")),
            ..Settings::default()
        };
        assert!(matches!(settings.ontology_path(), Err(CliError::FileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_engine_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bioq.toml");
        std::fs::write(&path, "tie_margin = 0.1\nmax_alternatives = 2\n").unwrap();

        let settings = Settings {
            config: Some(path),
            ..Settings::default()
        };
        let config = settings.engine_config().unwrap();
        assert_eq!(config.tie_margin, 0.1);
        assert_eq!(config.max_alternatives, 2);
    }
}
