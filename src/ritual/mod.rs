//! Ritual core: templates, execution context, lifecycle.
//!
//! ## Key Types
//!
//! - `RitualInfo`: static template (costs, interval, tier, ranges, structure)
//! - `Ritual`: behavior trait implemented by every concrete ritual
//! - `RitualContext` / `OperationBudget`: capped essence accounting for a tick
//! - `RitualRegistry`: factories with configuration overrides applied
//! - `RitualAnchor`: lifecycle of one running instance, ranges, persistence
//! - `RitualResult` / `FailureReason` / `StopReason`: outcomes

mod anchor;
mod component;
mod context;
mod registry;
mod result;
mod template;

pub use anchor::{ActiveSnapshot, Activator, AnchorSnapshot, Notification, RitualAnchor};
pub use component::{check_structure, missing_components, MarkerType, RitualComponent, StructureBuilder};
pub use context::{MaxOperations, OperationBudget, RitualContext, RitualEnv};
pub use registry::{RitualFactory, RitualRegistry};
pub use result::{FailureReason, RitualResult, StopReason};
pub use template::{Ritual, RitualInfo, RitualRange};
