use super::entity::{CanonicalEntity, EntitySpan, UnresolvedSpan};
use super::intent::{IntentKind, RankedIntent, SlotFill, SlotName};
use crate::ontology::SnapshotVersion;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FrameStatus {
    Complete,
    /// Required slots could not be filled for any eligible intent
    Incomplete { missing: Vec<SlotName> },
}

/// The resolved, slot-filled meaning of one question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticFrame {
    pub intent: IntentKind,
    pub slots: BTreeMap<SlotName, SlotFill>,
    pub status: FrameStatus,
    /// Normalized text the spans point into
    pub text: String,
    pub spans: Vec<EntitySpan>,
    pub ranked_intents: Vec<RankedIntent>,
    /// Intents tried in order, ending with the chosen one when complete
    pub attempted_intents: Vec<IntentKind>,
    /// Resolved mentions in text order, one per ontology id
    pub entities: Vec<CanonicalEntity>,
    pub unresolved: Vec<UnresolvedSpan>,
    pub snapshot_version: SnapshotVersion,
}

impl SemanticFrame {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, FrameStatus::Complete)
    }

    pub fn missing_slots(&self) -> &[SlotName] {
        match &self.status {
            FrameStatus::Complete => &[],
            FrameStatus::Incomplete { missing } => missing,
        }
    }

    pub fn slot(&self, name: SlotName) -> Option<&SlotFill> {
        self.slots.get(&name)
    }

    pub fn slot_entity(&self, name: SlotName) -> Option<&CanonicalEntity> {
        self.slots.get(&name).and_then(|fill| fill.value.entity())
    }

    /// True when any entity used by the frame was left ambiguous
    pub fn is_ambiguous(&self) -> bool {
        self.entities.iter().any(|e| e.ambiguous)
            || self
                .slots
                .values()
                .filter_map(|fill| fill.value.entity())
                .any(|e| e.ambiguous)
    }

    /// Entities the frame is about: slot entities first, then other mentions
    pub fn entity_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        let slot_entities = self.slots.values().filter_map(|fill| fill.value.entity());
        for entity in slot_entities.chain(self.entities.iter()) {
            if !ids.contains(&entity.ontology_id.as_str()) {
                ids.push(&entity.ontology_id);
            }
        }
        ids
    }

    pub fn find_entity(&self, ontology_id: &str) -> Option<&CanonicalEntity> {
        self.slots
            .values()
            .filter_map(|fill| fill.value.entity())
            .chain(self.entities.iter())
            .find(|e| e.ontology_id == ontology_id)
    }
}
