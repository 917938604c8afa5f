//! Entities as seen by rituals.
//!
//! Rituals never hold on to entities between ticks. They query ids inside
//! a box, read the snapshot through [`World::entity`](super::World::entity)
//! and mutate through the world's checked operations.

use rustc_hash::FxHashMap;

use super::item::ItemStack;
use crate::core::{EntityId, OwnerId, Vec3};

/// What kind of entity this is.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    /// A player, identified by their essence owner id.
    Player(OwnerId),
    /// A passive animal; may be a baby.
    Animal,
    /// A hostile creature.
    Monster,
    /// A dropped item stack.
    Item(ItemStack),
    /// Anything else (projectiles, vehicles).
    Other,
}

/// Timed status effects rituals can grant or clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusEffect {
    Regeneration,
    FireResistance,
    Levitation,
    SlowFalling,
    Strength,
    Resistance,
}

/// A running status effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectInstance {
    /// Remaining duration in ticks.
    pub duration: u32,
    pub amplifier: u8,
}

/// Snapshot of an entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub pos: Vec3,
    pub velocity: Vec3,
    pub health: f32,
    pub max_health: f32,
    /// Negative while a baby; grows toward 0.
    pub age: i32,
    pub on_ground: bool,
    pub fall_distance: f32,
    /// Flight granted by an external source.
    pub may_fly: bool,
    pub effects: FxHashMap<StatusEffect, EffectInstance>,
}

impl Entity {
    /// Create an entity with full health. The host assigns the id on spawn.
    #[must_use]
    pub fn new(kind: EntityKind, pos: Vec3) -> Self {
        let max_health = match kind {
            EntityKind::Item(_) | EntityKind::Other => 0.0,
            _ => 20.0,
        };
        Self {
            id: EntityId::new(0),
            kind,
            pos,
            velocity: Vec3::ZERO,
            health: max_health,
            max_health,
            age: 0,
            on_ground: true,
            fall_distance: 0.0,
            may_fly: false,
            effects: FxHashMap::default(),
        }
    }

    /// Set health (builder pattern).
    #[must_use]
    pub fn with_health(mut self, health: f32, max_health: f32) -> Self {
        self.health = health;
        self.max_health = max_health;
        self
    }

    /// Set age (builder pattern).
    #[must_use]
    pub fn with_age(mut self, age: i32) -> Self {
        self.age = age;
        self
    }

    /// Mark as airborne (builder pattern).
    #[must_use]
    pub fn airborne(mut self, fall_distance: f32) -> Self {
        self.on_ground = false;
        self.fall_distance = fall_distance;
        self
    }

    /// Is this a living creature?
    #[must_use]
    pub fn is_living(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_) | EntityKind::Animal | EntityKind::Monster)
    }

    /// The player's owner id, if this is a player.
    #[must_use]
    pub fn player(&self) -> Option<OwnerId> {
        match self.kind {
            EntityKind::Player(owner) => Some(owner),
            _ => None,
        }
    }

    /// The item stack, if this is a dropped item.
    #[must_use]
    pub fn item(&self) -> Option<&ItemStack> {
        match &self.kind {
            EntityKind::Item(stack) => Some(stack),
            _ => None,
        }
    }

    /// Is this a baby?
    #[must_use]
    pub fn is_baby(&self) -> bool {
        self.age < 0
    }

    /// Does the entity have a status effect?
    #[must_use]
    pub fn has_effect(&self, effect: StatusEffect) -> bool {
        self.effects.contains_key(&effect)
    }
}

/// Coarse entity filter for range queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityFilter {
    Any,
    Living,
    Player,
    /// Living entities that are not players.
    NonPlayerLiving,
    Animal,
    Monster,
    Item,
}

impl EntityFilter {
    /// Does the entity pass this filter?
    #[must_use]
    pub fn matches(self, entity: &Entity) -> bool {
        match self {
            EntityFilter::Any => true,
            EntityFilter::Living => entity.is_living(),
            EntityFilter::Player => entity.player().is_some(),
            EntityFilter::NonPlayerLiving => entity.is_living() && entity.player().is_none(),
            EntityFilter::Animal => entity.kind == EntityKind::Animal,
            EntityFilter::Monster => entity.kind == EntityKind::Monster,
            EntityFilter::Item => entity.item().is_some(),
        }
    }
}
