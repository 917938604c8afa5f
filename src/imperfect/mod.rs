//! Imperfect rituals: single-use effects keyed by a catalyst block.
//!
//! An imperfect ritual has no structure and no refresh. Activating the
//! imperfect anchor reads the block directly above it, finds the ritual
//! whose catalyst requirement that block satisfies, charges the activation
//! cost and runs the effect once.
//!
//! Requirements come in three kinds, looked up in this priority:
//!
//! 1. `Block`: exact block, a hash probe
//! 2. `Tag`: tag membership, a scan of the tag list
//! 3. `Predicate`: arbitrary test on the block state, a scan of the rest
//!
//! Configuration (`ImperfectStats`) may replace a ritual's requirement with
//! a block or a tag, disable it, override its cost or make it consume the
//! catalyst.

mod builtin;
mod registry;

pub use builtin::{DayRitual, FrostRitual, NightRitual, RainRitual, ResistanceRitual, ZombieRitual};
pub use registry::ImperfectRegistry;

use crate::core::{BlockBox, BlockId, BlockPos, EntityId, OwnerId, RitualRng, TagId};
use crate::world::{BlockState, EntityFilter, World};

/// How far from the anchor the activating player is searched for.
pub const ACTIVATOR_SEARCH_RADIUS: i32 = 8;

/// What the catalyst block must be.
#[derive(Clone, Debug)]
pub enum CatalystRequirement {
    Block(BlockId),
    Tag(TagId),
    Predicate(fn(&BlockState) -> bool),
}

impl CatalystRequirement {
    /// Does the block state satisfy this requirement?
    #[must_use]
    pub fn matches(&self, world: &dyn World, state: &BlockState) -> bool {
        match self {
            CatalystRequirement::Block(block) => &state.block == block,
            CatalystRequirement::Tag(tag) => world.block_has_tag(&state.block, tag),
            CatalystRequirement::Predicate(test) => test(state),
        }
    }
}

/// Everything an imperfect ritual's effect may touch.
pub struct ImperfectContext<'e> {
    pub world: &'e mut dyn World,
    pub rng: &'e mut RitualRng,
    pub anchor_pos: BlockPos,
    /// Position of the catalyst block, directly above the anchor.
    pub catalyst_pos: BlockPos,
    pub activator: OwnerId,
}

impl ImperfectContext<'_> {
    /// The activating player's entity, if they are near the anchor.
    #[must_use]
    pub fn activator_entity(&self) -> Option<EntityId> {
        let area = BlockBox::single(self.anchor_pos).inflate(ACTIVATOR_SEARCH_RADIUS);
        self.world
            .entities_in(&area, EntityFilter::Player)
            .into_iter()
            .find(|id| {
                self.world
                    .entity(*id)
                    .and_then(|e| e.player())
                    .is_some_and(|p| p == self.activator)
            })
    }
}

/// A single-use ritual triggered by a catalyst block.
pub trait ImperfectRitual: std::fmt::Debug {
    /// Registry id.
    fn id(&self) -> &str;

    /// Built-in catalyst requirement, used when configuration names none.
    fn requirement(&self) -> CatalystRequirement;

    /// Built-in activation cost.
    fn activation_cost(&self) -> i64;

    /// Does activation strike lightning on the catalyst?
    fn lightning(&self) -> bool {
        true
    }

    /// Translation key of the ritual's name.
    fn translation_key(&self) -> String {
        format!("ritual.essence_rituals.imperfect.{}", self.id())
    }

    /// Run the effect. Returning false cancels the activation unpaid.
    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool;
}
