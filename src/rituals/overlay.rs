//! Temporary blocks owned by one ritual instance.
//!
//! Overlay rituals swap world blocks for a placeholder and remember what
//! was there in a [`TrackedBlocks`] map. Positions are restored when they
//! fall out of the ritual's range and all at once when the ritual stops.
//! The map is part of the instance's persisted state, so a reloaded anchor
//! still cleans up after itself.
//!
//! ## Example
//!
//! ```
//! use essence_rituals::core::{BlockId, BlockPos};
//! use essence_rituals::rituals::TrackedBlocks;
//! use essence_rituals::world::memory::MemoryWorld;
//! use essence_rituals::world::{BlockState, World};
//!
//! let placeholder = BlockId::from_static("spectral_block");
//! let mut world = MemoryWorld::new();
//! let mut tracked = TrackedBlocks::new();
//!
//! let pos = BlockPos::new(0, 1, 0);
//! world.set_block(pos, BlockId::WATER);
//! world.replace_block(pos, BlockState::of(placeholder.clone()), None);
//! tracked.track(pos, BlockState::of(BlockId::WATER));
//!
//! assert_eq!(tracked.restore_all(&mut world, &placeholder, None), 1);
//! assert_eq!(world.block_state(pos).block, BlockId::WATER);
//! assert!(tracked.is_empty());
//! ```

use im::OrdMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockId, BlockPos, OwnerId};
use crate::ritual::{
    MarkerType, Ritual, RitualAnchor, RitualContext, RitualEnv, RitualInfo, StopReason, StructureBuilder,
};
use crate::world::{BlockState, EntityFilter, World};

// =============================================================================
// Tracked blocks
// =============================================================================

/// One tracked position in persisted form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub pos: BlockPos,
    pub original: BlockState,
}

/// Positions replaced by a placeholder, with the block that was there.
///
/// Serialized as a list of `{pos, original}` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TrackedEntry>", into = "Vec<TrackedEntry>")]
pub struct TrackedBlocks {
    blocks: OrdMap<BlockPos, BlockState>,
}

impl From<Vec<TrackedEntry>> for TrackedBlocks {
    fn from(entries: Vec<TrackedEntry>) -> Self {
        Self {
            blocks: entries.into_iter().map(|e| (e.pos, e.original)).collect(),
        }
    }
}

impl From<TrackedBlocks> for Vec<TrackedEntry> {
    fn from(tracked: TrackedBlocks) -> Self {
        tracked
            .blocks
            .into_iter()
            .map(|(pos, original)| TrackedEntry { pos, original })
            .collect()
    }
}

impl TrackedBlocks {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the original block at a position. The first original wins.
    pub fn track(&mut self, pos: BlockPos, original: BlockState) {
        if !self.blocks.contains_key(&pos) {
            self.blocks.insert(pos, original);
        }
    }

    /// Is the position tracked?
    #[must_use]
    pub fn is_tracked(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos)
    }

    /// Number of tracked positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Is nothing tracked?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Tracked positions in order.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.blocks.keys().copied()
    }

    /// Restore one position and stop tracking it.
    ///
    /// The original only comes back while the placeholder is still there;
    /// a block changed by someone else is left alone.
    pub fn restore(
        &mut self,
        world: &mut dyn World,
        pos: BlockPos,
        placeholder: &BlockId,
        actor: Option<OwnerId>,
    ) -> bool {
        let Some(original) = self.blocks.remove(&pos) else {
            return false;
        };
        if world.block_state(pos).block != *placeholder {
            return false;
        }
        let restored = world.replace_block(pos, original, actor);
        if !restored {
            log::warn!("could not restore overlay block at {}", pos);
        }
        restored
    }

    /// Restore every tracked position matching `predicate`. Returns how
    /// many originals came back.
    pub fn restore_where(
        &mut self,
        world: &mut dyn World,
        placeholder: &BlockId,
        actor: Option<OwnerId>,
        predicate: impl Fn(BlockPos) -> bool,
    ) -> usize {
        let selected: Vec<BlockPos> = self.positions().filter(|pos| predicate(*pos)).collect();
        selected
            .into_iter()
            .filter(|pos| self.restore(world, *pos, placeholder, actor))
            .count()
    }

    /// Restore everything.
    pub fn restore_all(&mut self, world: &mut dyn World, placeholder: &BlockId, actor: Option<OwnerId>) -> usize {
        self.restore_where(world, placeholder, actor, |_| true)
    }
}

/// Restore tracked positions whose offset from the anchor left `area`.
fn restore_outside(
    tracked: &mut TrackedBlocks,
    world: &mut dyn World,
    placeholder: &BlockId,
    actor: Option<OwnerId>,
    anchor: BlockPos,
    area: Option<&AreaDescriptor>,
) -> usize {
    tracked.restore_where(world, placeholder, actor, |pos| {
        area.map_or(true, |area| !area.is_within_area(pos.relative_to(anchor)))
    })
}

fn load_tracked(extra: &serde_json::Value) -> Result<TrackedBlocks, serde_json::Error> {
    TrackedBlocks::deserialize(extra)
}

// =============================================================================
// Suppression
// =============================================================================

/// Holds back fluids inside a hemisphere.
#[derive(Debug)]
pub struct SuppressionRitual {
    info: RitualInfo,
    tracked: TrackedBlocks,
}

impl SuppressionRitual {
    pub const SUPPRESSION_RANGE: &'static str = "suppression_range";
    pub const PLACEHOLDER: BlockId = BlockId::from_static("spectral_block");

    /// Blocks currently suppressed.
    #[must_use]
    pub fn tracked(&self) -> &TrackedBlocks {
        &self.tracked
    }
}

impl Default for SuppressionRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("suppression", "Ritual of Suppression")
                .with_costs(10000, 2)
                .with_refresh_time(1)
                .with_range(
                    Self::SUPPRESSION_RANGE,
                    AreaDescriptor::hemisphere(BlockPos::ZERO, 10),
                    RangeLimits::new(10_000, 15, 15),
                )
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Water)
                        .corners(1, 0, MarkerType::Air)
                        .parallel(2, 0, MarkerType::Dusk)
                        .corners(2, 0, MarkerType::Water)
                        .build(),
                ),
            tracked: TrackedBlocks::new(),
        }
    }
}

impl Ritual for SuppressionRitual {
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
        let origin = ctx.anchor_pos();
        let area = ctx.effective_range(anchor, info, Self::SUPPRESSION_RANGE);
        restore_outside(&mut self.tracked, &mut *ctx.world, &Self::PLACEHOLDER, owner, origin, area.as_ref());

        let positions = ctx.positions_in_range(anchor, info, Self::SUPPRESSION_RANGE);
        let tracked = &mut self.tracked;
        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            let state = ctx.world.block_state(pos);
            if !state.is_fluid() || tracked.is_tracked(pos) {
                continue;
            }
            let suppressed =
                budget.attempt(|| ctx.world.replace_block(pos, BlockState::of(Self::PLACEHOLDER), owner));
            if suppressed {
                tracked.track(pos, state);
            }
        }
        ctx.spend(budget);
    }

    fn stop(&mut self, anchor: &RitualAnchor, env: &mut RitualEnv<'_>, _reason: StopReason) {
        let restored = self.tracked.restore_all(&mut *env.world, &Self::PLACEHOLDER, anchor.owner());
        log::debug!("suppression at {} released {} blocks", anchor.pos(), restored);
    }

    fn save_extra(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.tracked).ok()
    }

    fn load_extra(&mut self, extra: &serde_json::Value) -> Result<(), serde_json::Error> {
        self.tracked = load_tracked(extra)?;
        Ok(())
    }
}

// =============================================================================
// Phantom bridge
// =============================================================================

/// Places phantom blocks under players' feet while they walk over gaps.
#[derive(Debug)]
pub struct PhantomBridgeRitual {
    info: RitualInfo,
    tracked: TrackedBlocks,
}

impl PhantomBridgeRitual {
    pub const BRIDGE_RANGE: &'static str = "bridge_range";
    pub const PLACEHOLDER: BlockId = BlockId::from_static("phantom_block");

    /// Phantom blocks currently placed.
    #[must_use]
    pub fn tracked(&self) -> &TrackedBlocks {
        &self.tracked
    }
}

impl Default for PhantomBridgeRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("phantom_bridge", "Ritual of the Phantom Bridge")
                .with_costs(10000, 1)
                .with_refresh_time(1)
                .with_range(
                    Self::BRIDGE_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-10, -5, -10), 21, 20, 21),
                    RangeLimits::new(20000, 20, 20),
                )
                .with_setting("bridge_radius", 1)
                .with_components(
                    StructureBuilder::new()
                        .corners(1, 0, MarkerType::Air)
                        .parallel(2, 0, MarkerType::Dusk)
                        .corners(3, 0, MarkerType::Air)
                        .build(),
                ),
            tracked: TrackedBlocks::new(),
        }
    }
}

impl Ritual for PhantomBridgeRitual {
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
        let radius = info.setting_i32("bridge_radius");
        let walkers = ctx.entities_in_range(anchor, info, Self::BRIDGE_RANGE, EntityFilter::Player);

        let mut support = FxHashSet::default();
        for id in walkers {
            let Some(feet) = ctx.world.entity(id).map(|e| e.pos.block_pos()) else {
                continue;
            };
            for dx in -radius..=radius {
                for dz in -radius..=radius {
                    support.insert(feet.add(dx, -1, dz));
                }
            }
        }
        self.tracked
            .restore_where(&mut *ctx.world, &Self::PLACEHOLDER, owner, |pos| !support.contains(&pos));

        let mut under: Vec<BlockPos> = support.into_iter().collect();
        under.sort();
        let tracked = &mut self.tracked;
        let mut budget = ctx.budget(info.refresh_cost);
        for pos in under {
            if budget.is_exhausted() {
                break;
            }
            if !ctx.world.block_state(pos).is_air() {
                continue;
            }
            if budget.attempt(|| ctx.world.place_block(pos, BlockState::of(Self::PLACEHOLDER), owner)) {
                tracked.track(pos, BlockState::AIR);
            }
        }
        ctx.spend(budget);
    }

    fn stop(&mut self, anchor: &RitualAnchor, env: &mut RitualEnv<'_>, _reason: StopReason) {
        self.tracked.restore_all(&mut *env.world, &Self::PLACEHOLDER, anchor.owner());
    }

    fn save_extra(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.tracked).ok()
    }

    fn load_extra(&mut self, extra: &serde_json::Value) -> Result<(), serde_json::Error> {
        self.tracked = load_tracked(extra)?;
        Ok(())
    }
}

// =============================================================================
// Lantern
// =============================================================================

/// Lights dark ground on a grid with spectral lights.
#[derive(Debug)]
pub struct LanternRitual {
    info: RitualInfo,
    tracked: TrackedBlocks,
}

impl LanternRitual {
    pub const LIGHT_RANGE: &'static str = "light_range";
    pub const PLACEHOLDER: BlockId = BlockId::from_static("spectral_light");

    /// Lights currently placed.
    #[must_use]
    pub fn tracked(&self) -> &TrackedBlocks {
        &self.tracked
    }
}

impl Default for LanternRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("lantern", "Ritual of the Lantern")
                .with_costs(5000, 3)
                .with_refresh_time(5)
                .with_range(
                    Self::LIGHT_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-16, -4, -16), 33, 9, 33),
                    RangeLimits::new(20000, 16, 16),
                )
                .with_setting("spacing", 4)
                .with_setting("min_light", 8)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Fire)
                        .corners(1, 0, MarkerType::Dawn)
                        .build(),
                ),
            tracked: TrackedBlocks::new(),
        }
    }
}

impl Ritual for LanternRitual {
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
        let area = ctx.effective_range(anchor, info, Self::LIGHT_RANGE);
        restore_outside(&mut self.tracked, &mut *ctx.world, &Self::PLACEHOLDER, owner, origin, area.as_ref());

        let spacing = info.setting_i32("spacing").max(1);
        let min_light = u8::try_from(info.setting_u32("min_light").min(15)).unwrap_or(15);
        let positions = ctx.positions_in_range(anchor, info, Self::LIGHT_RANGE);
        let tracked = &mut self.tracked;
        let mut budget = ctx.budget(info.refresh_cost);
        for pos in positions {
            if budget.is_exhausted() {
                break;
            }
            let offset = pos.relative_to(origin);
            if offset.x.rem_euclid(spacing) != 0 || offset.z.rem_euclid(spacing) != 0 {
                continue;
            }
            let dark_air = ctx.world.block_state(pos).is_air() && ctx.world.light_level(pos) < min_light;
            if !dark_air {
                continue;
            }
            // Lights never stand on other lights.
            let ground = ctx.world.block_state(pos.below());
            if ground.is_replaceable() || ground.block == Self::PLACEHOLDER || tracked.is_tracked(pos.below()) {
                continue;
            }
            if budget.attempt(|| ctx.world.place_block(pos, BlockState::of(Self::PLACEHOLDER), owner)) {
                tracked.track(pos, BlockState::AIR);
            }
        }
        ctx.spend(budget);
    }

    fn stop(&mut self, anchor: &RitualAnchor, env: &mut RitualEnv<'_>, _reason: StopReason) {
        self.tracked.restore_all(&mut *env.world, &Self::PLACEHOLDER, anchor.owner());
    }

    fn save_extra(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.tracked).ok()
    }

    fn load_extra(&mut self, extra: &serde_json::Value) -> Result<(), serde_json::Error> {
        self.tracked = load_tracked(extra)?;
        Ok(())
    }
}
