use super::models::{OntologySource, SnapshotDocument};
use super::snapshot::OntologySnapshot;
use crate::error::OntologyError;
use std::path::Path;
use tracing::{info, instrument};

/// Serialization of a snapshot document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "json" => Some(SnapshotFormat::Json),
            "yaml" | "yml" => Some(SnapshotFormat::Yaml),
            _ => None,
        }
    }
}

/// Parse and index a snapshot document held in memory
pub fn parse_snapshot(
    content: &str,
    format: SnapshotFormat,
    active: &[OntologySource],
) -> Result<OntologySnapshot, OntologyError> {
    let document: SnapshotDocument = match format {
        SnapshotFormat::Json => {
            serde_json::from_str(content).map_err(|e| OntologyError::Parse(e.to_string()))?
        },
        SnapshotFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| OntologyError::Parse(e.to_string()))?
        },
    };

    OntologySnapshot::from_document(document, active)
}

/// Load a snapshot file; the format follows the file extension
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_snapshot_file(
    path: impl AsRef<Path>,
    active: &[OntologySource],
) -> Result<OntologySnapshot, OntologyError> {
    let path = path.as_ref();
    let format = SnapshotFormat::from_path(path)
        .ok_or_else(|| OntologyError::UnsupportedFormat(path.to_path_buf()))?;

    let content = std::fs::read_to_string(path).map_err(|source| OntologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let snapshot = parse_snapshot(&content, format, active)?;
    info!(version = %snapshot.version(), "loaded snapshot file");
    Ok(snapshot)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
version: yaml-test
records:
  NCBITaxon:10090:
    source: ncbi_taxonomy
    label: Mus musculus
    synonyms: [mouse, house mouse]
    attributes:
      ensembl_name: mus_musculus
  NCBIGene:22059:
    source: ncbi_gene
    label: Trp53
    synonyms: [p53]
    xrefs: [NCBITaxon:10090]
"#;

    #[test]
    fn test_parse_yaml() {
        let snapshot = parse_snapshot(YAML, SnapshotFormat::Yaml, &OntologySource::ALL).unwrap();
        assert_eq!(snapshot.len(), 2);
        let mouse = snapshot.by_id("NCBITaxon:10090").unwrap();
        assert_eq!(mouse.attribute("ensembl_name"), Some("mus_musculus"));
    }

    #[test]
    fn test_json_and_yaml_digest_agree() {
        let yaml = parse_snapshot(YAML, SnapshotFormat::Yaml, &OntologySource::ALL).unwrap();
        let document: SnapshotDocument = serde_yaml::from_str(YAML).unwrap();
        let json = serde_json::to_string(&document).unwrap();
        let from_json = parse_snapshot(&json, SnapshotFormat::Json, &OntologySource::ALL).unwrap();
        assert_eq!(yaml.version(), from_json.version());
    }

    #[test]
    fn test_load_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(YAML.as_bytes()).unwrap();
        let snapshot = load_snapshot_file(file.path(), &OntologySource::ALL).unwrap();
        assert_eq!(snapshot.version().label, "yaml-test");
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".obo").tempfile().unwrap();
        let err = load_snapshot_file(file.path(), &OntologySource::ALL).unwrap_err();
        assert!(matches!(err, OntologyError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_snapshot_file("/nonexistent/snapshot.json", &OntologySource::ALL).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/snapshot.json"));
    }
}
