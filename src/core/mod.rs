//! Core types: geometry, identifiers, RNG, configuration, errors, messages.
//!
//! Everything here is independent of any particular ritual. Rituals are
//! tuned through `RitualConfig` rather than by changing their code.

pub mod pos;
pub mod ids;
pub mod rng;
pub mod config;
pub mod error;
pub mod text;

pub use pos::{BlockBox, BlockPos, Direction, Vec3};
pub use ids::{BlockId, EntityId, ItemId, OwnerId, TagId};
pub use rng::{RitualRng, RitualRngState};
pub use config::{ImperfectStats, RitualConfig, RitualOverrides};
pub use error::RitualError;
pub use text::Message;
