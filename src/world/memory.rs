//! In-memory host implementation.
//!
//! `MemoryWorld`, `MemoryEssence` and `MemorySynthesizer` implement the
//! host contracts over plain maps. They are deterministic (entities are
//! kept in id order) and expose direct setters for arranging a scene.
//!
//! ## Usage
//!
//! ```
//! use essence_rituals::core::{BlockId, BlockPos, OwnerId};
//! use essence_rituals::world::memory::{MemoryEssence, MemoryWorld};
//! use essence_rituals::world::{BlockState, EssenceNetwork, World};
//!
//! let mut world = MemoryWorld::new();
//! let pos = BlockPos::new(0, 64, 0);
//! assert!(world.place_block(pos, BlockState::of(BlockId::WATER), None));
//! world.protect(pos.above());
//! assert!(!world.place_block(pos.above(), BlockState::of(BlockId::WATER), None));
//!
//! let owner = OwnerId::from_u128(1);
//! let mut essence = MemoryEssence::new().with_account(owner, 100);
//! assert_eq!(essence.spend(owner, 150, 1000), 100);
//! assert_eq!(essence.balance(owner), Some(0));
//! ```

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{
    BlockState, EffectInstance, Entity, EntityFilter, EntityKind, EssenceNetwork, ItemStack,
    StatusEffect, StructureSynthesizer, SynthesisRequest, World,
};
use crate::core::{BlockBox, BlockId, BlockPos, EntityId, ItemId, OwnerId, RitualRng, TagId, Vec3};

/// Slots per container unless configured otherwise.
pub const DEFAULT_CONTAINER_SLOTS: usize = 27;

/// Items per slot.
pub const MAX_STACK_SIZE: u32 = 64;

#[derive(Clone, Debug, Default)]
struct Container {
    slots: Vec<ItemStack>,
    max_slots: usize,
    fluid: Option<(BlockId, u32)>,
    fluid_capacity: u32,
    /// Most a single fill may add, like a slow inlet.
    intake: Option<u32>,
}

/// A world held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemoryWorld {
    blocks: FxHashMap<BlockPos, BlockState>,
    protected: FxHashSet<BlockPos>,
    tags: FxHashMap<TagId, FxHashSet<BlockId>>,
    block_items: FxHashSet<ItemId>,
    light: FxHashMap<BlockPos, u8>,
    default_light: u8,
    containers: FxHashMap<BlockPos, Container>,
    entities: BTreeMap<EntityId, Entity>,
    next_entity: u32,
    time_of_day: u64,
    raining: bool,
    lightning: Vec<BlockPos>,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorld {
    /// Create an empty world with the default tags and block items.
    #[must_use]
    pub fn new() -> Self {
        let mut world = Self {
            blocks: FxHashMap::default(),
            protected: FxHashSet::default(),
            tags: FxHashMap::default(),
            block_items: FxHashSet::default(),
            light: FxHashMap::default(),
            default_light: 15,
            containers: FxHashMap::default(),
            entities: BTreeMap::new(),
            next_entity: 1,
            time_of_day: 6000,
            raining: false,
            lightning: Vec::new(),
        };

        for (tag, blocks) in [
            (TagId::LOGS, &["oak_log", "birch_log"][..]),
            (TagId::LEAVES, &["oak_leaves", "birch_leaves"][..]),
            (TagId::ORES, &["iron_ore", "gold_ore", "coal_ore"][..]),
            (TagId::CROPS, &["wheat", "carrots", "potatoes"][..]),
            (TagId::ICE, &["ice", "packed_ice"][..]),
            (TagId::UNBREAKABLE, &["bedrock", "master_ritual_stone"][..]),
        ] {
            for block in blocks {
                world.add_tag(tag.clone(), BlockId::from_static(*block));
            }
        }

        for item in [
            "stone",
            "cobblestone",
            "dirt",
            "glass",
            "oak_log",
            "stone_bricks",
            "blood_rune",
            "glowstone",
        ] {
            world.block_items.insert(ItemId::from_static(item));
        }

        world
    }

    // === Scene setup ===

    /// Set a block without any checks.
    pub fn set_block(&mut self, pos: BlockPos, state: impl Into<BlockState>) {
        let state = state.into();
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    /// Deny every mutation at a position.
    pub fn protect(&mut self, pos: BlockPos) {
        self.protected.insert(pos);
    }

    /// Add a block to a tag.
    pub fn add_tag(&mut self, tag: TagId, block: BlockId) {
        self.tags.entry(tag).or_default().insert(block);
    }

    /// Register an item that places the block of the same name.
    pub fn add_block_item(&mut self, item: ItemId) {
        self.block_items.insert(item);
    }

    /// Set the light level at a position.
    pub fn set_light(&mut self, pos: BlockPos, level: u8) {
        self.light.insert(pos, level.min(15));
    }

    /// Set the light level of every position without an explicit level.
    pub fn set_default_light(&mut self, level: u8) {
        self.default_light = level.min(15);
    }

    /// Add an item container, placing a chest block if the position is empty.
    pub fn add_container(&mut self, pos: BlockPos, max_slots: usize) {
        if self.block_state(pos).is_air() {
            self.set_block(pos, BlockId::from_static("chest"));
        }
        self.containers.insert(
            pos,
            Container {
                max_slots,
                ..Container::default()
            },
        );
    }

    /// Add a fluid tank (a container that only holds fluid).
    pub fn add_tank(&mut self, pos: BlockPos, capacity: u32) {
        if self.block_state(pos).is_air() {
            self.set_block(pos, BlockId::from_static("tank"));
        }
        self.containers.insert(
            pos,
            Container {
                fluid_capacity: capacity,
                ..Container::default()
            },
        );
    }

    /// Cap how much one fill of the tank at a position may add.
    pub fn limit_tank_intake(&mut self, pos: BlockPos, per_fill: u32) {
        if let Some(container) = self.containers.get_mut(&pos) {
            container.intake = Some(per_fill);
        }
    }

    /// Fluid held by the tank at a position.
    #[must_use]
    pub fn tank_contents(&self, pos: BlockPos) -> Option<(BlockId, u32)> {
        self.containers.get(&pos).and_then(|c| c.fluid.clone())
    }

    /// Total count of an item in the container at a position.
    #[must_use]
    pub fn count_items(&self, pos: BlockPos, item: &ItemId) -> u32 {
        self.containers
            .get(&pos)
            .map(|c| c.slots.iter().filter(|s| &s.item == item).map(|s| s.count).sum())
            .unwrap_or(0)
    }

    /// Count positions of a block inside a box.
    #[must_use]
    pub fn count_blocks(&self, area: &BlockBox, block: &BlockId) -> usize {
        area.positions()
            .filter(|p| &self.block_state(*p).block == block)
            .count()
    }

    /// Mutable access to an entity.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All entity snapshots in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Lightning strikes so far, oldest first.
    #[must_use]
    pub fn lightning_strikes(&self) -> &[BlockPos] {
        &self.lightning
    }

    fn may_mutate(&self, pos: BlockPos) -> bool {
        !self.protected.contains(&pos)
    }

    fn is_unbreakable(&self, state: &BlockState) -> bool {
        self.block_has_tag(&state.block, &TagId::UNBREAKABLE)
    }

    fn living_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id).filter(|e| e.is_living())
    }
}

impl World for MemoryWorld {
    fn block_state(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).cloned().unwrap_or(BlockState::AIR)
    }

    fn place_block(&mut self, pos: BlockPos, state: BlockState, _actor: Option<OwnerId>) -> bool {
        if !self.may_mutate(pos) || !self.block_state(pos).is_replaceable() {
            return false;
        }
        self.set_block(pos, state);
        true
    }

    fn replace_block(&mut self, pos: BlockPos, state: BlockState, _actor: Option<OwnerId>) -> bool {
        if !self.may_mutate(pos) || self.is_unbreakable(&self.block_state(pos)) {
            return false;
        }
        self.set_block(pos, state);
        true
    }

    fn break_block(&mut self, pos: BlockPos, _actor: Option<OwnerId>) -> Option<Vec<ItemStack>> {
        let current = self.block_state(pos);
        if !self.may_mutate(pos) || current.is_air() || current.is_fluid() || self.is_unbreakable(&current) {
            return None;
        }
        self.blocks.remove(&pos);
        Some(vec![ItemStack::new(current.block.item(), 1)])
    }

    fn block_has_tag(&self, block: &BlockId, tag: &TagId) -> bool {
        self.tags.get(tag).is_some_and(|blocks| blocks.contains(block))
    }

    fn block_for_item(&self, item: &ItemId) -> Option<BlockId> {
        self.block_items
            .contains(item)
            .then(|| BlockId::new(item.as_str()))
    }

    fn light_level(&self, pos: BlockPos) -> u8 {
        self.light.get(&pos).copied().unwrap_or(self.default_light)
    }

    fn has_container(&self, pos: BlockPos) -> bool {
        self.containers.contains_key(&pos)
    }

    fn container_items(&self, pos: BlockPos) -> Vec<ItemStack> {
        self.containers
            .get(&pos)
            .map(|c| c.slots.clone())
            .unwrap_or_default()
    }

    fn insert_item(&mut self, pos: BlockPos, mut stack: ItemStack) -> ItemStack {
        let Some(container) = self.containers.get_mut(&pos) else {
            return stack;
        };

        for slot in container.slots.iter_mut() {
            if !slot.stacks_with(&stack) {
                continue;
            }
            let room = MAX_STACK_SIZE.saturating_sub(slot.count);
            let moved = room.min(stack.count);
            slot.count += moved;
            stack.count -= moved;
            if stack.is_empty() {
                return stack;
            }
        }

        while !stack.is_empty() && container.slots.len() < container.max_slots {
            let moved = stack.split(MAX_STACK_SIZE);
            container.slots.push(moved);
        }
        stack
    }

    fn extract_item(
        &mut self,
        pos: BlockPos,
        filter: &dyn Fn(&ItemStack) -> bool,
        max: u32,
    ) -> Option<ItemStack> {
        let container = self.containers.get_mut(&pos)?;
        let index = container
            .slots
            .iter()
            .position(|s| !s.is_empty() && filter(s))?;
        let taken = container.slots[index].split(max);
        if container.slots[index].is_empty() {
            container.slots.remove(index);
        }
        (!taken.is_empty()).then_some(taken)
    }

    fn fluid_space(&self, pos: BlockPos, fluid: &BlockId) -> u32 {
        let Some(container) = self.containers.get(&pos) else {
            return 0;
        };
        match &container.fluid {
            Some((held, stored)) if held == fluid => container.fluid_capacity.saturating_sub(*stored),
            Some(_) => 0,
            None => container.fluid_capacity,
        }
    }

    fn insert_fluid(&mut self, pos: BlockPos, fluid: &BlockId, amount: u32) -> u32 {
        let Some(container) = self.containers.get_mut(&pos) else {
            return 0;
        };
        let stored = match &container.fluid {
            Some((held, stored)) if held == fluid => *stored,
            Some(_) => return 0,
            None => 0,
        };
        let accepted = amount
            .min(container.fluid_capacity.saturating_sub(stored))
            .min(container.intake.unwrap_or(u32::MAX));
        if accepted > 0 {
            container.fluid = Some((fluid.clone(), stored + accepted));
        }
        accepted
    }

    fn entities_in(&self, area: &BlockBox, filter: EntityFilter) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| area.contains_point(e.pos) && filter.matches(e))
            .map(|e| e.id)
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn hurt(&mut self, id: EntityId, amount: f32) -> bool {
        let Some(entity) = self.living_mut(id) else {
            return false;
        };
        entity.health -= amount;
        if entity.health <= 0.0 {
            self.entities.remove(&id);
        }
        true
    }

    fn heal(&mut self, id: EntityId, amount: f32) -> bool {
        let Some(entity) = self.living_mut(id) else {
            return false;
        };
        if entity.health >= entity.max_health {
            return false;
        }
        entity.health = (entity.health + amount).min(entity.max_health);
        true
    }

    fn add_effect(&mut self, id: EntityId, effect: StatusEffect, duration: u32, amplifier: u8) -> bool {
        let Some(entity) = self.living_mut(id) else {
            return false;
        };
        entity.effects.insert(effect, EffectInstance { duration, amplifier });
        true
    }

    fn remove_effect(&mut self, id: EntityId, effect: StatusEffect) -> bool {
        self.entities
            .get_mut(&id)
            .is_some_and(|e| e.effects.remove(&effect).is_some())
    }

    fn set_velocity(&mut self, id: EntityId, velocity: Vec3) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.velocity = velocity;
        if velocity.y > 0.0 {
            entity.on_ground = false;
        }
        true
    }

    fn teleport(&mut self, id: EntityId, to: Vec3) -> bool {
        let target = self.block_state(to.block_pos());
        if !target.is_replaceable() && !target.is_fluid() {
            return false;
        }
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.pos = to;
        entity.velocity = Vec3::ZERO;
        entity.fall_distance = 0.0;
        true
    }

    fn set_may_fly(&mut self, id: EntityId, may_fly: bool) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) if entity.player().is_some() => {
                entity.may_fly = may_fly;
                true
            }
            _ => false,
        }
    }

    fn set_fall_distance(&mut self, id: EntityId, distance: f32) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.fall_distance = distance;
        true
    }

    fn set_age(&mut self, id: EntityId, age: i32) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) if entity.kind == EntityKind::Animal => {
                entity.age = age;
                true
            }
            _ => false,
        }
    }

    fn set_item(&mut self, id: EntityId, stack: ItemStack) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if !matches!(entity.kind, EntityKind::Item(_)) {
            return false;
        }
        if stack.is_empty() {
            self.entities.remove(&id);
        } else {
            entity.kind = EntityKind::Item(stack);
        }
        true
    }

    fn spawn_entity(&mut self, mut entity: Entity) -> Option<EntityId> {
        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        Some(id)
    }

    fn remove_entity(&mut self, id: EntityId) -> bool {
        self.entities.remove(&id).is_some()
    }

    fn time_of_day(&self) -> u64 {
        self.time_of_day
    }

    fn set_time_of_day(&mut self, time: u64) {
        self.time_of_day = time % 24000;
    }

    fn is_raining(&self) -> bool {
        self.raining
    }

    fn set_raining(&mut self, raining: bool) {
        self.raining = raining;
    }

    fn strike_lightning(&mut self, pos: BlockPos) {
        self.lightning.push(pos);
    }
}

/// Essence accounts held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryEssence {
    accounts: FxHashMap<OwnerId, i64>,
}

impl MemoryEssence {
    /// Create a network without accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account with a starting balance (builder pattern).
    #[must_use]
    pub fn with_account(mut self, owner: OwnerId, balance: i64) -> Self {
        self.accounts.insert(owner, balance);
        self
    }

    /// Set a balance, opening the account if needed.
    pub fn set_balance(&mut self, owner: OwnerId, balance: i64) {
        self.accounts.insert(owner, balance);
    }
}

impl EssenceNetwork for MemoryEssence {
    fn balance(&self, owner: OwnerId) -> Option<i64> {
        self.accounts.get(&owner).copied()
    }

    fn spend(&mut self, owner: OwnerId, amount: i64, cap: i64) -> i64 {
        let Some(balance) = self.accounts.get_mut(&owner) else {
            return 0;
        };
        let spent = amount.min(cap).min(*balance).max(0);
        *balance -= spent;
        spent
    }

    fn credit(&mut self, owner: OwnerId, amount: i64, cap: i64) -> i64 {
        let Some(balance) = self.accounts.get_mut(&owner) else {
            return 0;
        };
        let added = amount.min(cap - *balance).max(0);
        *balance += added;
        added
    }
}

/// Synthesizer that builds simple shapes and records every request.
#[derive(Clone, Debug, Default)]
pub struct MemorySynthesizer {
    /// Requests received, in order.
    pub requests: Vec<SynthesisRequest>,
    /// When set, every request fails.
    pub fail: bool,
}

impl MemorySynthesizer {
    /// Create a synthesizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StructureSynthesizer for MemorySynthesizer {
    fn generate(
        &mut self,
        world: &mut dyn World,
        request: &SynthesisRequest,
        _rng: &mut RitualRng,
    ) -> Option<BlockBox> {
        self.requests.push(request.clone());
        if self.fail {
            return None;
        }

        match request {
            SynthesisRequest::Dungeon { origin } => {
                let room = BlockBox::new(origin.add(-3, -1, -3), origin.add(4, 4, 4));
                let inner = BlockBox::new(origin.add(-2, 0, -2), origin.add(3, 3, 3));
                for pos in room.positions() {
                    let state = if inner.contains(pos) {
                        BlockState::AIR
                    } else {
                        BlockState::of(BlockId::STONE_BRICKS)
                    };
                    world.replace_block(pos, state, None);
                }
                Some(room)
            }
            SynthesisRequest::Meteor { center, radius, filler } => {
                let r = i32::try_from(*radius).unwrap_or(i32::MAX);
                let bounds = BlockBox::single(*center).inflate(r);
                let r_sq = i64::from(r) * i64::from(r);
                for pos in bounds.positions() {
                    if pos.distance_sq(*center) <= r_sq {
                        world.replace_block(pos, BlockState::of(filler.clone()), None);
                    }
                }
                Some(bounds)
            }
        }
    }
}
