//! Rituals that feed or drain the container above the anchor.
//!
//! All of them skip the refresh when no container is present.

use serde::Deserialize;

use super::{container_pos, is_structural, store_drops, ScanCursor};
use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockId, BlockPos, ItemId, OwnerId, TagId};
use crate::ritual::{MarkerType, Ritual, RitualAnchor, RitualContext, RitualEnv, RitualInfo, StructureBuilder};
use crate::world::{BlockState, EntityFilter, ItemStack, World};

/// Millibuckets in one fluid source.
pub const BUCKET: u32 = 1000;

/// Place a block taken from the container, consuming one item.
///
/// Uses the first stack that places `wanted`, or any block when `wanted`
/// is `None`. The placement is reverted if the item cannot be extracted.
fn place_from_container(
    world: &mut dyn World,
    container: BlockPos,
    pos: BlockPos,
    wanted: Option<&BlockId>,
    owner: Option<OwnerId>,
) -> bool {
    let found = world.container_items(container).into_iter().find_map(|stack| {
        let block = world.block_for_item(&stack.item)?;
        wanted.map_or(true, |w| *w == block).then_some((stack.item, block))
    });
    let Some((item, block)) = found else {
        return false;
    };
    if !world.place_block(pos, BlockState::of(block), owner) {
        return false;
    }
    if world.extract_item(container, &|s: &ItemStack| s.item == item, 1).is_some() {
        true
    } else {
        world.replace_block(pos, BlockState::AIR, owner);
        false
    }
}

// =============================================================================
// Cobblestone
// =============================================================================

/// Generates cobblestone into the container.
#[derive(Debug)]
pub struct CobblestoneRitual {
    info: RitualInfo,
}

impl Default for CobblestoneRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("cobblestone", "Le Vulcanos Frigius")
                .with_costs(500, 25)
                .with_refresh_time(40)
                .with_setting("per_tick", 8)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Fire)
                        .corners(1, 0, MarkerType::Water)
                        .build(),
                ),
        }
    }
}

impl Ritual for CobblestoneRitual {
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
        let container = container_pos(ctx.anchor_pos());
        if !ctx.world.has_container(container) {
            return;
        }
        let cobblestone = BlockId::COBBLESTONE.item();

        let mut budget = ctx.budget(info.refresh_cost);
        for _ in 0..info.setting_u32("per_tick") {
            let stack = ItemStack::new(cobblestone.clone(), 1);
            if !budget.attempt(|| ctx.world.insert_item(container, stack).is_empty()) {
                break;
            }
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Crushing
// =============================================================================

/// Breaks blocks below the anchor and stores the drops.
#[derive(Debug)]
pub struct CrushingRitual {
    info: RitualInfo,
}

impl CrushingRitual {
    pub const CRUSHING_RANGE: &'static str = "crushing_range";
}

impl Default for CrushingRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("crushing", "Ritual of the Crusher")
                .with_costs(2500, 7)
                .with_refresh_time(40)
                .with_range(
                    Self::CRUSHING_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-1, -3, -1), 3),
                    RangeLimits::new(50, 10, 10),
                )
                .with_setting("blocks_per_tick", 1)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .parallel(2, 0, MarkerType::Fire)
                        .corners(2, 0, MarkerType::Dusk)
                        .build(),
                ),
        }
    }
}

impl Ritual for CrushingRitual {
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
        let container = container_pos(origin);
        if !ctx.world.has_container(container) {
            return;
        }
        let per_tick = u64::from(info.setting_u32("blocks_per_tick"));
        let positions = ctx.positions_in_range(anchor, info, Self::CRUSHING_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() || budget.performed() >= per_tick {
                break;
            }
            let state = ctx.world.block_state(pos);
            if state.is_air() || state.is_fluid() || is_structural(&*ctx.world, origin, pos) {
                continue;
            }
            budget.attempt(|| match ctx.world.break_block(pos, owner) {
                Some(drops) => {
                    store_drops(&mut *ctx.world, container, drops);
                    true
                }
                None => false,
            });
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Felling
// =============================================================================

/// Cuts down trees, storing logs and leaves in the container.
#[derive(Debug)]
pub struct FellingRitual {
    info: RitualInfo,
}

impl FellingRitual {
    pub const FELLING_RANGE: &'static str = "felling_range";
}

impl Default for FellingRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("felling", "The Timberman")
                .with_costs(20000, 10)
                .with_refresh_time(20)
                .with_range(
                    Self::FELLING_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-10, -3, -10), 21, 30, 21),
                    RangeLimits::new(14000, 15, 30),
                )
                .with_setting("blocks_per_tick", 1)
                .with_components(
                    StructureBuilder::new()
                        .corners(1, 0, MarkerType::Earth)
                        .corners(1, 1, MarkerType::Air)
                        .build(),
                ),
        }
    }
}

impl Ritual for FellingRitual {
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
        let container = container_pos(ctx.anchor_pos());
        if !ctx.world.has_container(container) {
            return;
        }
        let per_tick = u64::from(info.setting_u32("blocks_per_tick"));
        let positions = ctx.positions_in_range(anchor, info, Self::FELLING_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() || budget.performed() >= per_tick {
                break;
            }
            let block = ctx.world.block_state(pos).block;
            let is_tree = ctx.world.block_has_tag(&block, &TagId::LOGS) || ctx.world.block_has_tag(&block, &TagId::LEAVES);
            if !is_tree {
                continue;
            }
            budget.attempt(|| match ctx.world.break_block(pos, owner) {
                Some(drops) => {
                    store_drops(&mut *ctx.world, container, drops);
                    true
                }
                None => false,
            });
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Placer
// =============================================================================

/// Fills empty positions in its range with blocks from the container.
#[derive(Debug)]
pub struct PlacerRitual {
    info: RitualInfo,
}

impl PlacerRitual {
    pub const PLACER_RANGE: &'static str = "placer_range";
}

impl Default for PlacerRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("placer", "The Filler")
                .with_costs(5000, 2)
                .with_refresh_time(20)
                .with_range(
                    Self::PLACER_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-2, 1, -2), 5, 1, 5),
                    RangeLimits::new(300, 7, 7),
                )
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .corners(2, 0, MarkerType::Water)
                        .build(),
                ),
        }
    }
}

impl Ritual for PlacerRitual {
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
        let container = container_pos(ctx.anchor_pos());
        if !ctx.world.has_container(container) {
            return;
        }
        let positions = ctx.positions_in_range(anchor, info, Self::PLACER_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            if !ctx.world.block_state(pos).is_replaceable() {
                continue;
            }
            if !budget.attempt(|| place_from_container(&mut *ctx.world, container, pos, None, owner)) {
                // Nothing placeable left, or the position is protected.
                if ctx.world.container_items(container).is_empty() {
                    break;
                }
            }
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Ellipsoid
// =============================================================================

/// Builds the shell of the ellipsoid inscribed in its range, one scan
/// window per refresh.
#[derive(Debug)]
pub struct EllipsoidRitual {
    info: RitualInfo,
    scan: ScanCursor,
}

impl EllipsoidRitual {
    pub const SPHEROID_RANGE: &'static str = "spheroid_range";

    /// Position the next scan starts at.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.scan.cursor
    }
}

/// Is the world offset inside the ellipsoid inscribed in `[min, max)`?
fn in_ellipsoid(pos: BlockPos, min: BlockPos, max: BlockPos) -> bool {
    let axis = |p: i32, lo: i32, hi: i32| {
        let radius = f64::from(hi - lo) / 2.0;
        let d = (f64::from(p) + 0.5 - (f64::from(lo) + radius)) / radius;
        d * d
    };
    axis(pos.x, min.x, max.x) + axis(pos.y, min.y, max.y) + axis(pos.z, min.z, max.z) <= 1.0
}

/// Inside the ellipsoid with at least one face neighbor outside it.
fn on_ellipsoid_shell(pos: BlockPos, min: BlockPos, max: BlockPos) -> bool {
    in_ellipsoid(pos, min, max)
        && [
            pos.add(1, 0, 0),
            pos.add(-1, 0, 0),
            pos.above(),
            pos.below(),
            pos.add(0, 0, 1),
            pos.add(0, 0, -1),
        ]
        .into_iter()
        .any(|n| !in_ellipsoid(n, min, max))
}

impl Default for EllipsoidRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("ellipsoid", "Forming of the Ellipsoid")
                .with_costs(20000, 5)
                .with_refresh_time(5)
                .with_range(
                    Self::SPHEROID_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-10, -10, -10), 21),
                    RangeLimits::new(20000, 20, 20),
                )
                .with_setting("scan_per_tick", 128)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .corners(1, 0, MarkerType::Air)
                        .parallel(3, 0, MarkerType::Dusk)
                        .build(),
                ),
            scan: ScanCursor::default(),
        }
    }
}

impl Ritual for EllipsoidRitual {
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
        let container = container_pos(ctx.anchor_pos());
        if !ctx.world.has_container(container) {
            return;
        }
        let Some(bounds) = ctx.range_box(anchor, info, Self::SPHEROID_RANGE) else {
            return;
        };
        let positions: Vec<BlockPos> = bounds.positions().collect();
        if positions.is_empty() {
            return;
        }

        let start = self.scan.cursor % positions.len();
        let scan = (info.setting_u32("scan_per_tick") as usize).min(positions.len());
        let mut scanned = 0;
        let mut budget = ctx.budget(info.refresh_cost);

        while scanned < scan && !budget.is_exhausted() {
            let pos = positions[(start + scanned) % positions.len()];
            scanned += 1;
            if !on_ellipsoid_shell(pos, bounds.min, bounds.max) || !ctx.world.block_state(pos).is_replaceable() {
                continue;
            }
            if !budget.attempt(|| place_from_container(&mut *ctx.world, container, pos, None, owner)) {
                // Retry this position next refresh.
                scanned -= 1;
                break;
            }
        }

        self.scan.cursor = (start + scanned) % positions.len();
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
// Pump
// =============================================================================

/// Drains fluid sources below the anchor into the tank above it.
#[derive(Debug)]
pub struct PumpRitual {
    info: RitualInfo,
}

impl PumpRitual {
    pub const PUMP_RANGE: &'static str = "pump_range";
}

impl Default for PumpRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("pump", "Hymn of Syphoning")
                .with_costs(50000, 25)
                .with_refresh_time(20)
                .with_range(
                    Self::PUMP_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-5, -10, -5), 11, 10, 11),
                    RangeLimits::new(5000, 20, 20),
                )
                .with_setting("sources_per_tick", 1)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Water)
                        .corners(1, 0, MarkerType::Earth)
                        .parallel(2, -1, MarkerType::Water)
                        .build(),
                ),
        }
    }
}

impl Ritual for PumpRitual {
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
        let tank = container_pos(ctx.anchor_pos());
        if !ctx.world.has_container(tank) {
            return;
        }
        let per_tick = u64::from(info.setting_u32("sources_per_tick"));
        let positions = ctx.positions_in_range(anchor, info, Self::PUMP_RANGE);

        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() || budget.performed() >= per_tick {
                break;
            }
            let state = ctx.world.block_state(pos);
            if !state.is_fluid_source() || ctx.world.fluid_space(tank, &state.block) < BUCKET {
                continue;
            }
            budget.attempt(|| {
                if !ctx.world.replace_block(pos, BlockState::AIR, owner) {
                    return false;
                }
                let accepted = ctx.world.insert_fluid(tank, &state.block, BUCKET);
                if accepted == BUCKET {
                    return true;
                }
                log::warn!("tank at {} took {} of {} mB, restoring source at {}", tank, accepted, BUCKET, pos);
                ctx.world.replace_block(pos, state.clone(), owner);
                false
            });
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Zephyr
// =============================================================================

/// Collects dropped items into the container.
#[derive(Debug)]
pub struct ZephyrRitual {
    info: RitualInfo,
}

impl ZephyrRitual {
    pub const ZEPHYR_RANGE: &'static str = "zephyr_range";
}

impl Default for ZephyrRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("zephyr", "Call of the Zephyr")
                .with_costs(25000, 1)
                .with_refresh_time(1)
                .with_range(
                    Self::ZEPHYR_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-5, -5, -5), 11),
                    RangeLimits::new(2000, 10, 10),
                )
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Air)
                        .corners(2, 0, MarkerType::Air)
                        .build(),
                ),
        }
    }
}

impl Ritual for ZephyrRitual {
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
        let container = container_pos(ctx.anchor_pos());
        if !ctx.world.has_container(container) {
            return;
        }
        let drops = ctx.entities_in_range(anchor, info, Self::ZEPHYR_RANGE, EntityFilter::Item);

        let mut budget = ctx.budget(info.refresh_cost);
        for id in drops {
            if budget.is_exhausted() {
                break;
            }
            let Some(stack) = ctx.world.entity(id).and_then(|e| e.item()).cloned() else {
                continue;
            };
            budget.attempt(|| {
                let rest = ctx.world.insert_item(container, stack.clone());
                rest.count < stack.count && ctx.world.set_item(id, rest)
            });
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Altar builder
// =============================================================================

/// Builds a blood altar structure around the anchor from container items,
/// then stops itself.
#[derive(Debug)]
pub struct AltarBuilderRitual {
    info: RitualInfo,
}

impl AltarBuilderRitual {
    /// Anchor-relative blocks of the finished structure, in build order.
    #[must_use]
    pub fn schematic() -> Vec<(BlockPos, BlockId)> {
        let rune = BlockId::from_static("blood_rune");
        let glowstone = BlockId::from_static("glowstone");
        let mut blocks = Vec::new();
        for x in -1..=1 {
            for z in -1..=1 {
                if x != 0 || z != 0 {
                    blocks.push((BlockPos::new(x, -1, z), rune.clone()));
                }
            }
        }
        for (x, z) in [(-3, -3), (-3, 3), (3, -3), (3, 3)] {
            blocks.push((BlockPos::new(x, 0, z), BlockId::STONE_BRICKS));
            blocks.push((BlockPos::new(x, 1, z), BlockId::STONE_BRICKS));
            blocks.push((BlockPos::new(x, 2, z), glowstone.clone()));
        }
        blocks
    }
}

impl Default for AltarBuilderRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("altar_builder", "The Assembly of the High Altar")
                .with_costs(450, 75)
                .with_refresh_time(12)
                .with_setting("blocks_per_tick", 1)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .corners(2, 0, MarkerType::Dawn)
                        .build(),
                ),
        }
    }
}

impl Ritual for AltarBuilderRitual {
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
        let container = container_pos(origin);
        if !ctx.world.has_container(container) {
            return;
        }
        let remaining: Vec<(BlockPos, BlockId)> = Self::schematic()
            .into_iter()
            .map(|(offset, block)| (origin.offset(offset), block))
            .filter(|(pos, block)| ctx.world.block_state(*pos).block != *block)
            .collect();
        if remaining.is_empty() {
            log::info!("altar at {} complete", origin);
            anchor.request_stop();
            return;
        }

        let per_tick = u64::from(info.setting_u32("blocks_per_tick"));
        let mut budget = ctx.budget(info.refresh_cost);
        for (pos, block) in remaining {
            if budget.is_exhausted() || budget.performed() >= per_tick {
                break;
            }
            if !ctx.world.block_state(pos).is_replaceable() {
                continue;
            }
            budget.attempt(|| place_from_container(&mut *ctx.world, container, pos, Some(&block), owner));
        }
        ctx.spend(budget);
    }
}

/// Item ids the altar builder consumes, with the count of each.
#[must_use]
pub fn altar_materials() -> Vec<(ItemId, u32)> {
    let mut materials: Vec<(ItemId, u32)> = Vec::new();
    for (_, block) in AltarBuilderRitual::schematic() {
        let item = block.item();
        match materials.iter_mut().find(|(i, _)| *i == item) {
            Some((_, count)) => *count += 1,
            None => materials.push((item, 1)),
        }
    }
    materials
}
