//! # essence-rituals
//!
//! The ritual subsystem of a voxel resource-management simulation.
//!
//! Players build multiblock structures around an anchor block, activate
//! them by spending essence, and the anchor then runs a periodic effect
//! scoped to one or more resizable areas.
//!
//! ## Design Principles
//!
//! 1. **Host-Agnostic**: the world, the essence accounts and structure
//!    generation are traits. `world::memory` provides an in-memory host.
//!
//! 2. **Capped Spending**: a tick can only deduct essence by spending an
//!    `OperationBudget`, and a budget only covers what the balance
//!    captured at tick start allows.
//!
//! 3. **Configuration Over Code**: costs, intervals, tiers, range limits
//!    and ritual settings come from `RitualConfig`.
//!
//! ## Architecture
//!
//! - **Fresh Instances**: every activation creates a new ritual from its
//!   registered factory, so instance state never leaks between runs.
//!
//! - **Persistent Data Structures**: tracked overlay blocks and entity sets
//!   use `im` ordered collections; they clone cheaply and serialize in a
//!   stable order.
//!
//! - **Deterministic Randomness**: all randomness goes through `RitualRng`
//!   (ChaCha8), so a seeded tick is reproducible.
//!
//! ## Modules
//!
//! - `core`: geometry, identifiers, RNG, configuration, errors, messages
//! - `area`: area descriptors and range limits
//! - `world`: host contracts and the in-memory host
//! - `ritual`: templates, context, registry, anchor lifecycle
//! - `imperfect`: single-block rituals resolved by catalyst
//! - `rituals`: the built-in rituals
//! - `admin`: operator commands

pub mod core;
pub mod area;
pub mod world;
pub mod ritual;
pub mod imperfect;
pub mod rituals;
pub mod admin;

// Re-export commonly used types
pub use crate::core::{
    BlockBox, BlockPos, Direction, Vec3,
    BlockId, EntityId, ItemId, OwnerId, TagId,
    RitualRng, RitualRngState,
    ImperfectStats, RitualConfig, RitualOverrides,
    RitualError, Message,
};

pub use crate::area::{AreaDescriptor, RangeCheck, RangeLimits};

pub use crate::world::{
    BlockState, Entity, EntityFilter, EntityKind, EssenceNetwork, ItemStack,
    StatusEffect, StructureSynthesizer, SynthesisRequest, World,
};

pub use crate::ritual::{
    Activator, AnchorSnapshot, FailureReason, MarkerType, OperationBudget,
    Ritual, RitualAnchor, RitualComponent, RitualContext, RitualEnv,
    RitualInfo, RitualRegistry, RitualResult, StopReason, StructureBuilder,
};

pub use crate::imperfect::{CatalystRequirement, ImperfectRegistry, ImperfectRitual};
