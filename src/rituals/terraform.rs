//! Rituals that place, change or remove blocks in an area.

use serde::Deserialize;

use super::{is_structural, ScanCursor};
use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockId, BlockPos, TagId};
use crate::ritual::{MarkerType, Ritual, RitualAnchor, RitualContext, RitualEnv, RitualInfo, StructureBuilder};
use crate::world::{BlockState, Entity, EntityFilter, EntityKind, ItemStack, StatusEffect, World, CROP_MAX_AGE};

// =============================================================================
// Water
// =============================================================================

/// Fills every empty position of its range with water sources.
#[derive(Debug)]
pub struct WaterRitual {
    info: RitualInfo,
}

impl WaterRitual {
    pub const WATER_RANGE: &'static str = "water_range";
}

impl Default for WaterRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("water", "Ritual of the Full Spring")
                .with_costs(500, 25)
                .with_refresh_time(20)
                .with_range(
                    Self::WATER_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(0, 1, 0), 1, 1, 1),
                    RangeLimits::new(9, 3, 3),
                )
                .with_components(StructureBuilder::new().parallel(1, 0, MarkerType::Water).build()),
        }
    }
}

impl Ritual for WaterRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, info.refresh_cost) else {
            return;
        };
        let owner = Some(ctx.owner());
        let positions = ctx.positions_in_range(anchor, info, Self::WATER_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            budget.attempt(|| ctx.world.place_block(pos, BlockState::of(BlockId::WATER), owner));
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Lava
// =============================================================================

/// Fills its range with lava and shields living entities nearby from fire.
#[derive(Debug)]
pub struct LavaRitual {
    info: RitualInfo,
}

impl LavaRitual {
    pub const LAVA_RANGE: &'static str = "lava_range";
    pub const FIRE_RESIST_RANGE: &'static str = "fire_resist_range";
}

impl Default for LavaRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("lava", "Serenade of the Nether")
                .with_costs(10000, 500)
                .with_refresh_time(20)
                .with_range(
                    Self::LAVA_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(0, 1, 0), 1, 1, 1),
                    RangeLimits::new(9, 3, 3),
                )
                .with_range(
                    Self::FIRE_RESIST_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-5, -5, -5), 11),
                    RangeLimits::new(8000, 10, 10),
                )
                .with_setting("fire_resist_cost", 50)
                .with_setting("fire_resist_duration", 100)
                .with_components(StructureBuilder::new().parallel(1, 0, MarkerType::Fire).build()),
        }
    }
}

impl Ritual for LavaRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, 0) else {
            return;
        };
        let owner = Some(ctx.owner());

        let positions = ctx.positions_in_range(anchor, info, Self::LAVA_RANGE);
        let mut lava = ctx.budget(info.refresh_cost);
        for pos in positions {
            if lava.is_exhausted() {
                break;
            }
            lava.attempt(|| ctx.world.place_block(pos, BlockState::of(BlockId::LAVA), owner));
        }
        ctx.spend(lava);

        let duration = info.setting_u32("fire_resist_duration");
        let targets = ctx.entities_in_range_where(anchor, info, Self::FIRE_RESIST_RANGE, EntityFilter::Living, |e| {
            !e.has_effect(StatusEffect::FireResistance)
        });
        let mut resist = ctx.budget(info.setting("fire_resist_cost"));
        for id in targets {
            if resist.is_exhausted() {
                break;
            }
            resist.attempt(|| ctx.world.add_effect(id, StatusEffect::FireResistance, duration, 0));
        }
        ctx.spend(resist);
    }
}

// =============================================================================
// Green Grove
// =============================================================================

/// Grows immature crops one stage at a time.
#[derive(Debug)]
pub struct GreenGroveRitual {
    info: RitualInfo,
}

impl GreenGroveRitual {
    pub const GROWTH_RANGE: &'static str = "growth_range";
}

impl Default for GreenGroveRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("green_grove", "Ritual of the Green Grove")
                .with_costs(1000, 20)
                .with_refresh_time(20)
                .with_range(
                    Self::GROWTH_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-1, 2, -1), 3, 1, 3),
                    RangeLimits::new(81, 4, 4),
                )
                .with_setting("growth_chance", 3)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .corners(1, 0, MarkerType::Water)
                        .build(),
                ),
        }
    }
}

impl Ritual for GreenGroveRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, info.refresh_cost) else {
            return;
        };
        let owner = Some(ctx.owner());
        let chance = info.setting_u32("growth_chance");
        let positions = ctx.positions_in_range(anchor, info, Self::GROWTH_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            let state = ctx.world.block_state(pos);
            if !ctx.world.block_has_tag(&state.block, &TagId::CROPS) || state.age >= CROP_MAX_AGE {
                continue;
            }
            if !ctx.rng.one_in(chance) {
                continue;
            }
            let grown = state.clone().with_age(state.age + 1);
            budget.attempt(|| ctx.world.replace_block(pos, grown, owner));
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Harvest
// =============================================================================

/// Replants mature crops and drops their produce.
#[derive(Debug)]
pub struct HarvestRitual {
    info: RitualInfo,
}

impl HarvestRitual {
    pub const HARVEST_RANGE: &'static str = "harvest_range";
}

impl Default for HarvestRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("harvest", "Reap of the Harvest Moon")
                .with_costs(20000, 20)
                .with_refresh_time(20)
                .with_range(
                    Self::HARVEST_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-4, 1, -4), 9, 5, 9),
                    RangeLimits::new(1000, 8, 8),
                )
                .with_setting("yield", 2)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Dusk)
                        .corners(2, 0, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for HarvestRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, info.refresh_cost) else {
            return;
        };
        let owner = Some(ctx.owner());
        let produce = info.setting_u32("yield");
        let positions = ctx.positions_in_range(anchor, info, Self::HARVEST_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            let state = ctx.world.block_state(pos);
            if !ctx.world.block_has_tag(&state.block, &TagId::CROPS) || state.age < CROP_MAX_AGE {
                continue;
            }
            budget.attempt(|| {
                if !ctx.world.replace_block(pos, state.clone().with_age(0), owner) {
                    return false;
                }
                let drop = ItemStack::new(state.block.item(), produce);
                ctx.world.spawn_entity(Entity::new(EntityKind::Item(drop), pos.center()));
                true
            });
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Magnetism
// =============================================================================

/// Pulls ores from deep below up next to the anchor, leaving stone behind.
///
/// The scan resumes where the previous refresh stopped.
#[derive(Debug)]
pub struct MagnetismRitual {
    info: RitualInfo,
    scan: ScanCursor,
}

impl MagnetismRitual {
    pub const ORE_RANGE: &'static str = "ore_range";
    pub const PLACEMENT_RANGE: &'static str = "placement_range";

    /// Position the next scan starts at.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.scan.cursor
    }
}

impl Default for MagnetismRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("magnetism", "Ritual of Magnetism")
                .with_costs(5000, 50)
                .with_refresh_time(40)
                .with_range(
                    Self::ORE_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-4, -10, -4), 9, 10, 9),
                    RangeLimits::new(20000, 16, 64),
                )
                .with_range(
                    Self::PLACEMENT_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 3, 3),
                    RangeLimits::new(125, 4, 4),
                )
                .with_setting("scan_per_tick", 128)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .corners(2, -1, MarkerType::Earth)
                        .corners(2, 0, MarkerType::Air)
                        .build(),
                ),
            scan: ScanCursor::default(),
        }
    }
}

impl Ritual for MagnetismRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, info.refresh_cost) else {
            return;
        };
        let owner = Some(ctx.owner());
        let ores = ctx.positions_in_range(anchor, info, Self::ORE_RANGE);
        if ores.is_empty() {
            return;
        }
        let mut targets = ctx
            .positions_in_range(anchor, info, Self::PLACEMENT_RANGE)
            .into_iter()
            .filter(|p| ctx.world.block_state(*p).is_replaceable())
            .collect::<Vec<_>>()
            .into_iter()
            .peekable();

        let start = self.scan.cursor % ores.len();
        let scan = (info.setting_u32("scan_per_tick") as usize).min(ores.len());
        let mut scanned = 0;
        let mut budget = ctx.budget(info.refresh_cost);

        while scanned < scan && !budget.is_exhausted() {
            let pos = ores[(start + scanned) % ores.len()];
            scanned += 1;
            let state = ctx.world.block_state(pos);
            if !ctx.world.block_has_tag(&state.block, &TagId::ORES) {
                continue;
            }
            let Some(&target) = targets.peek() else {
                break;
            };
            // The target is only used up once the ore has left its place.
            let mut target_used = false;
            budget.attempt(|| {
                if !ctx.world.replace_block(pos, BlockState::of(BlockId::STONE), owner) {
                    return false;
                }
                target_used = true;
                if ctx.world.place_block(target, state.clone(), owner) {
                    true
                } else {
                    ctx.world.replace_block(pos, state.clone(), owner);
                    false
                }
            });
            if target_used {
                targets.next();
            }
        }

        self.scan.cursor = (start + scanned) % ores.len();
        ctx.spend(budget);
    }

    fn save_extra(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.scan).ok()
    }

    fn load_extra(&mut self, extra: &serde_json::Value) -> Result<(), serde_json::Error> {
        self.scan = ScanCursor::deserialize(extra)?;
        Ok(())
    }
}

// =============================================================================
// Void
// =============================================================================

/// Clears its range to air without drops.
#[derive(Debug)]
pub struct VoidRitual {
    info: RitualInfo,
}

impl VoidRitual {
    pub const VOID_RANGE: &'static str = "void_range";
}

impl Default for VoidRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("void", "Ritual of the Void")
                .with_costs(50000, 13)
                .with_refresh_time(20)
                .with_range(
                    Self::VOID_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-5, 1, -5), 11, 11, 11),
                    RangeLimits::new(10000, 16, 32),
                )
                .with_components(
                    StructureBuilder::new()
                        .corners(1, 0, MarkerType::Dusk)
                        .corners(2, 0, MarkerType::Dusk)
                        .parallel(3, 0, MarkerType::Dusk)
                        .build(),
                ),
        }
    }
}

impl Ritual for VoidRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, info.refresh_cost) else {
            return;
        };
        let owner = Some(ctx.owner());
        let origin = ctx.anchor_pos();
        let positions = ctx.positions_in_range(anchor, info, Self::VOID_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            if ctx.world.block_state(pos).is_air() || is_structural(&*ctx.world, origin, pos) {
                continue;
            }
            budget.attempt(|| ctx.world.replace_block(pos, BlockState::AIR, owner));
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Frost
// =============================================================================

/// Freezes water sources in its range.
#[derive(Debug)]
pub struct FrostRitual {
    info: RitualInfo,
}

impl FrostRitual {
    pub const FREEZE_RANGE: &'static str = "freeze_range";
}

impl Default for FrostRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("frost", "Ritual of the Frozen Lake")
                .with_costs(1000, 5)
                .with_refresh_time(20)
                .with_range(
                    Self::FREEZE_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-5, -1, -5), 11, 2, 11),
                    RangeLimits::new(2000, 10, 5),
                )
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Water)
                        .corners(1, 0, MarkerType::Air)
                        .build(),
                ),
        }
    }
}

impl Ritual for FrostRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let info = &self.info;
        let Some(mut ctx) = RitualContext::create(anchor, env, info.refresh_cost) else {
            return;
        };
        let owner = Some(ctx.owner());
        let positions = ctx.positions_in_range(anchor, info, Self::FREEZE_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            if !ctx.world.block_state(pos).is_water_source() {
                continue;
            }
            budget.attempt(|| ctx.world.replace_block(pos, BlockState::of(BlockId::ICE), owner));
        }
        ctx.spend(budget);
    }
}
