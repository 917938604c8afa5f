//! Host contracts consumed by rituals.
//!
//! Rituals do not own world state. The host implements these traits and
//! passes them in a [`RitualEnv`](crate::ritual::RitualEnv) on every tick:
//!
//! - [`World`]: permission-checked block mutation, containers, entity
//!   queries and mutation, time and weather
//! - [`EssenceNetwork`]: per-owner essence accounts
//! - [`StructureSynthesizer`]: procedural structure generation
//!
//! Every mutating operation reports whether it happened. Callers must check
//! the result and only count (and pay for) successful effects.
//!
//! [`memory`] provides an in-memory implementation of all three, used by
//! the test suite and by tooling that simulates rituals off-line.

mod block;
mod entity;
mod item;
pub mod memory;

pub use block::{BlockState, CROP_MAX_AGE};
pub use entity::{EffectInstance, Entity, EntityFilter, EntityKind, StatusEffect};
pub use item::ItemStack;

use crate::core::{BlockBox, BlockId, BlockPos, EntityId, ItemId, OwnerId, RitualRng, TagId, Vec3};

/// Block, container and entity access for one dimension.
///
/// `actor` is the player on whose behalf a mutation happens; the host uses
/// it for protection checks. `None` means the mutation is not attributed.
pub trait World {
    // === Blocks ===

    /// Current state at a position. Unknown positions read as air.
    fn block_state(&self, pos: BlockPos) -> BlockState;

    /// Place a block into a replaceable position.
    fn place_block(&mut self, pos: BlockPos, state: BlockState, actor: Option<OwnerId>) -> bool;

    /// Replace whatever is at a position, without drops.
    fn replace_block(&mut self, pos: BlockPos, state: BlockState, actor: Option<OwnerId>) -> bool;

    /// Break a block, returning its drops on success.
    fn break_block(&mut self, pos: BlockPos, actor: Option<OwnerId>) -> Option<Vec<ItemStack>>;

    /// Is the block a member of the tag?
    fn block_has_tag(&self, block: &BlockId, tag: &TagId) -> bool;

    /// The block an item places, if it is a block item.
    fn block_for_item(&self, item: &ItemId) -> Option<BlockId>;

    /// Combined light level, 0..=15.
    fn light_level(&self, pos: BlockPos) -> u8;

    // === Containers ===

    /// Is there an item container at the position?
    fn has_container(&self, pos: BlockPos) -> bool;

    /// Items currently held by the container (empty without a container).
    fn container_items(&self, pos: BlockPos) -> Vec<ItemStack>;

    /// Insert a stack, returning what did not fit.
    fn insert_item(&mut self, pos: BlockPos, stack: ItemStack) -> ItemStack;

    /// Extract up to `max` items of the first stack matching `filter`.
    fn extract_item(
        &mut self,
        pos: BlockPos,
        filter: &dyn Fn(&ItemStack) -> bool,
        max: u32,
    ) -> Option<ItemStack>;

    /// Room left in a fluid tank for `fluid`, in millibuckets.
    fn fluid_space(&self, pos: BlockPos, fluid: &BlockId) -> u32;

    /// Fill a fluid tank, returning the accepted amount in millibuckets.
    fn insert_fluid(&mut self, pos: BlockPos, fluid: &BlockId, amount: u32) -> u32;

    // === Entities ===

    /// Entities whose position lies in the box and passes the filter,
    /// in ascending id order.
    fn entities_in(&self, area: &BlockBox, filter: EntityFilter) -> Vec<EntityId>;

    /// Current snapshot of an entity.
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    /// Damage a living entity.
    fn hurt(&mut self, id: EntityId, amount: f32) -> bool;

    /// Heal a living entity up to its maximum.
    fn heal(&mut self, id: EntityId, amount: f32) -> bool;

    /// Grant or refresh a status effect.
    fn add_effect(&mut self, id: EntityId, effect: StatusEffect, duration: u32, amplifier: u8) -> bool;

    /// Clear a status effect. False if the entity did not have it.
    fn remove_effect(&mut self, id: EntityId, effect: StatusEffect) -> bool;

    /// Set velocity.
    fn set_velocity(&mut self, id: EntityId, velocity: Vec3) -> bool;

    /// Move an entity. Fails when the destination is obstructed.
    fn teleport(&mut self, id: EntityId, to: Vec3) -> bool;

    /// Grant or revoke flight.
    fn set_may_fly(&mut self, id: EntityId, may_fly: bool) -> bool;

    /// Reset or set the accumulated fall distance.
    fn set_fall_distance(&mut self, id: EntityId, distance: f32) -> bool;

    /// Set the growth age of an animal.
    fn set_age(&mut self, id: EntityId, age: i32) -> bool;

    /// Replace the stack carried by an item entity. An empty stack removes it.
    fn set_item(&mut self, id: EntityId, stack: ItemStack) -> bool;

    /// Spawn an entity; the host assigns its id.
    fn spawn_entity(&mut self, entity: Entity) -> Option<EntityId>;

    /// Remove an entity.
    fn remove_entity(&mut self, id: EntityId) -> bool;

    // === Level ===

    /// Time of day in ticks, 0..24000.
    fn time_of_day(&self) -> u64;

    /// Set the time of day.
    fn set_time_of_day(&mut self, time: u64);

    /// Is it raining?
    fn is_raining(&self) -> bool;

    /// Start or stop rain.
    fn set_raining(&mut self, raining: bool);

    /// Strike a lightning bolt at a position. Purely visual: no fire, no
    /// damage.
    fn strike_lightning(&mut self, pos: BlockPos);
}

/// Per-owner essence accounts.
pub trait EssenceNetwork {
    /// Current balance, or `None` when the owner has no account.
    fn balance(&self, owner: OwnerId) -> Option<i64>;

    /// Deduct `min(amount, cap, balance)`, returning what was deducted.
    fn spend(&mut self, owner: OwnerId, amount: i64, cap: i64) -> i64;

    /// Add up to `amount` without raising the balance above `cap`,
    /// returning what was added.
    fn credit(&mut self, owner: OwnerId, amount: i64, cap: i64) -> i64;
}

/// A structure the synthesizer can generate.
#[derive(Clone, Debug, PartialEq)]
pub enum SynthesisRequest {
    /// A dungeon whose entrance lies at `origin`.
    Dungeon { origin: BlockPos },
    /// A spherical meteor of `filler` around `center`.
    Meteor {
        center: BlockPos,
        radius: u32,
        filler: BlockId,
    },
}

/// Procedural structure generation, delegated to the host.
pub trait StructureSynthesizer {
    /// Generate a structure, returning the box it occupies.
    fn generate(
        &mut self,
        world: &mut dyn World,
        request: &SynthesisRequest,
        rng: &mut RitualRng,
    ) -> Option<BlockBox>;
}
