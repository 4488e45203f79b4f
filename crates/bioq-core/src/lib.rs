//! BioQ Core
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! The semantic query resolution engine. A question such as
//! "find mouse homologs of TP53" passes through four stages, each producing
//! new immutable records:
//!
//! 1. [`extract`]: normalization, entity spans and a ranked intent list
//! 2. [`resolve`]: canonical ontology ids and a slot-filled [`SemanticFrame`]
//! 3. [`compile`]: an ordered list of [`QueryDescriptor`]s for external services
//! 4. [`aggregate`]: execution through a [`ServiceClient`], normalization and
//!    provenance, yielding a [`ResolvedResult`]
//!
//! [`QueryEngine`] wires the stages together over a pinned
//! [`OntologySnapshot`](ontology::OntologySnapshot).
//!
//! # Example
//!
//! ```no_run
//! use bioq_core::{EngineConfig, QueryEngine, RawQuery};
//! use bioq_core::aggregate::ReplayClient;
//! use bioq_core::ontology::{load_snapshot_file, OntologyStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = EngineConfig::default();
//! let snapshot = load_snapshot_file("ontology.json", &config.active_sources)?;
//! let store = Arc::new(OntologyStore::new(snapshot));
//! let client = Arc::new(ReplayClient::from_file("responses.json")?);
//!
//! let engine = QueryEngine::new(store, config, client)?;
//! let result = engine.answer(&RawQuery::new("find mouse homologs of TP53")).await?;
//! println!("{:?}", result.status);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod extract;
pub mod model;
pub mod ontology;
pub mod resolve;
pub mod suggest;

pub use aggregate::{ServiceCall, ServiceClient, ServiceFailure};
pub use config::{AmbiguityPolicy, EngineConfig, SlotRequirements};
pub use engine::QueryEngine;
pub use error::{ConfigError, ExternalServiceError, OntologyError, QueryError};
pub use model::{
    AnnotationScope, CanonicalEntity, ContextHints, EntityKind, EntitySpan, IntentKind, QueryDescriptor,
    QueryPlan, RankedIntent, RawQuery, ResolvedResult, ResultStatus, SemanticFrame,
};
