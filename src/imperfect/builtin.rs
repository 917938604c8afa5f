//! Built-in imperfect rituals.

use super::{CatalystRequirement, ImperfectContext, ImperfectRitual};
use crate::core::{BlockBox, BlockId, TagId};
use crate::world::{BlockState, Entity, EntityKind, StatusEffect, World};

/// Sets the time to morning.
#[derive(Clone, Copy, Debug, Default)]
pub struct DayRitual;

impl ImperfectRitual for DayRitual {
    fn id(&self) -> &str {
        "day"
    }

    fn requirement(&self) -> CatalystRequirement {
        CatalystRequirement::Block(BlockId::from_static("gold_block"))
    }

    fn activation_cost(&self) -> i64 {
        5000
    }

    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool {
        ctx.world.set_time_of_day(1000);
        true
    }
}

/// Sets the time to nightfall.
#[derive(Clone, Copy, Debug, Default)]
pub struct NightRitual;

impl ImperfectRitual for NightRitual {
    fn id(&self) -> &str {
        "night"
    }

    fn requirement(&self) -> CatalystRequirement {
        CatalystRequirement::Block(BlockId::from_static("lapis_block"))
    }

    fn activation_cost(&self) -> i64 {
        100
    }

    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool {
        ctx.world.set_time_of_day(13000);
        true
    }
}

/// Toggles rain. The catalyst is any water source.
#[derive(Clone, Copy, Debug, Default)]
pub struct RainRitual;

impl ImperfectRitual for RainRitual {
    fn id(&self) -> &str {
        "rain"
    }

    fn requirement(&self) -> CatalystRequirement {
        CatalystRequirement::Predicate(BlockState::is_water_source)
    }

    fn activation_cost(&self) -> i64 {
        5000
    }

    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool {
        let raining = ctx.world.is_raining();
        ctx.world.set_raining(!raining);
        true
    }
}

/// Grants fire resistance to the activating player.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResistanceRitual;

impl ResistanceRitual {
    /// Effect duration in ticks.
    pub const DURATION: u32 = 1200;
}

impl ImperfectRitual for ResistanceRitual {
    fn id(&self) -> &str {
        "resistance"
    }

    fn requirement(&self) -> CatalystRequirement {
        CatalystRequirement::Block(BlockId::BEDROCK)
    }

    fn activation_cost(&self) -> i64 {
        5000
    }

    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool {
        match ctx.activator_entity() {
            Some(player) => ctx
                .world
                .add_effect(player, StatusEffect::FireResistance, Self::DURATION, 1),
            None => false,
        }
    }
}

/// Summons a strengthened zombie on the catalyst.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZombieRitual;

impl ZombieRitual {
    pub const HEALTH: f32 = 40.0;
    pub const DURATION: u32 = 20_000;
}

impl ImperfectRitual for ZombieRitual {
    fn id(&self) -> &str {
        "zombie"
    }

    fn requirement(&self) -> CatalystRequirement {
        CatalystRequirement::Block(BlockId::from_static("coal_block"))
    }

    fn activation_cost(&self) -> i64 {
        5000
    }

    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool {
        let zombie = Entity::new(EntityKind::Monster, ctx.catalyst_pos.above().bottom_center())
            .with_health(Self::HEALTH, Self::HEALTH);
        let Some(id) = ctx.world.spawn_entity(zombie) else {
            return false;
        };
        for effect in [StatusEffect::Strength, StatusEffect::Resistance, StatusEffect::FireResistance] {
            ctx.world.add_effect(id, effect, Self::DURATION, 1);
        }
        true
    }
}

/// Freezes nearby water sources.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrostRitual;

impl FrostRitual {
    /// Half width of the frozen square around the anchor.
    pub const RADIUS: i32 = 2;
}

impl ImperfectRitual for FrostRitual {
    fn id(&self) -> &str {
        "frost"
    }

    fn requirement(&self) -> CatalystRequirement {
        CatalystRequirement::Tag(TagId::ICE)
    }

    fn activation_cost(&self) -> i64 {
        2000
    }

    fn on_activate(&self, ctx: &mut ImperfectContext<'_>) -> bool {
        let r = Self::RADIUS;
        let area = BlockBox::new(ctx.anchor_pos.add(-r, 0, -r), ctx.anchor_pos.add(r + 1, 1, r + 1));
        let activator = Some(ctx.activator);
        let sources: Vec<_> = area
            .positions()
            .filter(|pos| ctx.world.block_state(*pos).is_water_source())
            .collect();
        let frozen = sources
            .into_iter()
            .filter(|pos| ctx.world.replace_block(*pos, BlockState::of(BlockId::ICE), activator))
            .count();
        log::debug!("frost froze {} blocks around {}", frozen, ctx.anchor_pos);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockPos, OwnerId, RitualRng, Vec3};
    use crate::world::memory::MemoryWorld;

    fn context<'e>(world: &'e mut MemoryWorld, rng: &'e mut RitualRng) -> ImperfectContext<'e> {
        ImperfectContext {
            world,
            rng,
            anchor_pos: BlockPos::ZERO,
            catalyst_pos: BlockPos::new(0, 1, 0),
            activator: OwnerId::from_u128(5),
        }
    }

    #[test]
    fn test_rain_toggles() {
        let mut world = MemoryWorld::new();
        let mut rng = RitualRng::new(0);
        let mut ctx = context(&mut world, &mut rng);
        assert!(RainRitual.on_activate(&mut ctx));
        assert!(ctx.world.is_raining());
        assert!(RainRitual.on_activate(&mut ctx));
        assert!(!ctx.world.is_raining());
    }

    #[test]
    fn test_resistance_needs_player_nearby() {
        let mut world = MemoryWorld::new();
        let mut rng = RitualRng::new(0);
        assert!(!ResistanceRitual.on_activate(&mut context(&mut world, &mut rng)));

        let player = world
            .spawn_entity(Entity::new(EntityKind::Player(OwnerId::from_u128(5)), Vec3::new(2.5, 0.0, 2.5)))
            .unwrap();
        assert!(ResistanceRitual.on_activate(&mut context(&mut world, &mut rng)));
        assert!(world.entity(player).unwrap().has_effect(StatusEffect::FireResistance));
    }

    #[test]
    fn test_zombie_spawns_strengthened() {
        let mut world = MemoryWorld::new();
        let mut rng = RitualRng::new(0);
        assert!(ZombieRitual.on_activate(&mut context(&mut world, &mut rng)));
        let zombie = world.entities().next().unwrap();
        assert_eq!(zombie.kind, EntityKind::Monster);
        assert_eq!(zombie.max_health, ZombieRitual::HEALTH);
        assert!(zombie.has_effect(StatusEffect::Strength));
    }

    #[test]
    fn test_frost_freezes_sources_only() {
        let mut world = MemoryWorld::new();
        world.set_block(BlockPos::new(1, 0, 1), BlockId::WATER);
        world.set_block(BlockPos::new(-2, 0, 0), BlockState::of(BlockId::WATER).with_age(2));
        world.set_block(BlockPos::new(3, 0, 0), BlockId::WATER);
        let mut rng = RitualRng::new(0);
        assert!(FrostRitual.on_activate(&mut context(&mut world, &mut rng)));

        assert_eq!(world.block_state(BlockPos::new(1, 0, 1)).block, BlockId::ICE);
        assert_eq!(world.block_state(BlockPos::new(-2, 0, 0)).block, BlockId::WATER);
        assert_eq!(world.block_state(BlockPos::new(3, 0, 0)).block, BlockId::WATER);
    }
}
