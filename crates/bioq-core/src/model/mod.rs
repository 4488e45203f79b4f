//! Records exchanged between pipeline stages
//!
//! Every stage consumes the records of the previous one and produces new
//! ones; nothing here is mutated after construction.

mod descriptor;
mod entity;
mod frame;
mod intent;
mod query;
mod result;

pub use descriptor::{DescriptorId, ParamValue, QueryDescriptor, QueryPlan, ResponseShape, ServiceKind};
pub use entity::{AlternativeCandidate, CanonicalEntity, EntityKind, EntitySpan, UnresolvedSpan};
pub use frame::{FrameStatus, SemanticFrame};
pub use intent::{
    AnnotationScope, HomologyType, IntentKind, RankedIntent, SlotFill, SlotName, SlotOrigin,
    SlotValue,
};
pub use query::{ContextHints, RawQuery};
pub use result::{
    CallOutcome, EntityFacts, Fact, Payload, ProvenanceEntry, ResolvedResult, ResultStatus,
};
