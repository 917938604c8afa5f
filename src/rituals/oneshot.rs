//! Single transformations and procedural generation.
//!
//! Crystal splitting, binding and the dungeon ritual stop themselves once
//! their work is done. The meteor ritual keeps waiting for catalysts.

use super::is_structural;
use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockId, BlockPos, Direction, ItemId};
use crate::ritual::{MarkerType, Ritual, RitualAnchor, RitualContext, RitualEnv, RitualInfo, StructureBuilder};
use crate::world::{BlockState, EntityFilter, ItemStack, SynthesisRequest, World};

/// Every block of the structure, in world coordinates.
fn structure_positions(info: &RitualInfo, anchor: BlockPos, facing: Direction) -> Vec<BlockPos> {
    info.components()
        .iter()
        .map(|component| component.position(anchor, facing))
        .collect()
}

// =============================================================================
// Crystal split
// =============================================================================

/// Splits a raw crystal cluster above the anchor into four aspected
/// crystals around it.
#[derive(Debug)]
pub struct CrystalSplitRitual {
    info: RitualInfo,
}

impl CrystalSplitRitual {
    pub const RAW_CLUSTER: BlockId = BlockId::from_static("raw_crystal_cluster");

    /// Aspected crystal grown toward each horizontal direction, clockwise
    /// from north.
    pub const ASPECTS: [BlockId; 4] = [
        BlockId::from_static("aspected_crystal_water"),
        BlockId::from_static("aspected_crystal_fire"),
        BlockId::from_static("aspected_crystal_earth"),
        BlockId::from_static("aspected_crystal_air"),
    ];
}

impl Default for CrystalSplitRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("crystal_split", "Resonance of the Faceted Crystal")
                .with_costs(50000, 1000)
                .with_refresh_time(20)
                .with_components(
                    StructureBuilder::new()
                        .single(1, 0, 0, MarkerType::Water)
                        .single(-1, 0, 0, MarkerType::Fire)
                        .single(0, 0, 1, MarkerType::Earth)
                        .single(0, 0, -1, MarkerType::Air)
                        .corners(1, 0, MarkerType::Blank)
                        .build(),
                ),
        }
    }
}

impl Ritual for CrystalSplitRitual {
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
        let cluster = ctx.anchor_pos().above();
        if ctx.world.block_state(cluster).block != Self::RAW_CLUSTER {
            return;
        }
        let targets: Vec<(BlockPos, BlockId)> = Direction::HORIZONTAL
            .iter()
            .zip(Self::ASPECTS)
            .map(|(dir, aspect)| (cluster.offset(dir.step()), aspect))
            .collect();
        if targets.iter().any(|(pos, _)| !ctx.world.block_state(*pos).is_replaceable()) {
            return;
        }

        let mut budget = ctx.budget(info.refresh_cost);
        let split = budget.attempt(|| {
            let mut placed = Vec::new();
            for (pos, aspect) in &targets {
                if !ctx.world.place_block(*pos, BlockState::of(aspect.clone()), owner) {
                    break;
                }
                placed.push(*pos);
            }
            if placed.len() == targets.len() && ctx.world.replace_block(cluster, BlockState::AIR, owner) {
                return true;
            }
            for pos in placed {
                ctx.world.replace_block(pos, BlockState::AIR, owner);
            }
            false
        });
        ctx.spend(budget);

        if split {
            anchor.request_stop();
        }
    }
}

// =============================================================================
// Binding
// =============================================================================

/// Binds one dropped item in range into its bound form, then stops.
#[derive(Debug)]
pub struct BindingRitual {
    info: RitualInfo,
}

impl BindingRitual {
    pub const BINDING_RANGE: &'static str = "binding_range";

    /// Input item and its bound form.
    pub const RECIPES: [(ItemId, ItemId); 5] = [
        (ItemId::from_static("iron_sword"), ItemId::from_static("bound_blade")),
        (ItemId::from_static("iron_pickaxe"), ItemId::from_static("bound_pickaxe")),
        (ItemId::from_static("iron_axe"), ItemId::from_static("bound_axe")),
        (ItemId::from_static("iron_shovel"), ItemId::from_static("bound_shovel")),
        (ItemId::from_static("diamond"), ItemId::from_static("bound_gem")),
    ];

    /// Bound form of an item, if it has one.
    #[must_use]
    pub fn bound_form(item: &ItemId) -> Option<ItemId> {
        Self::RECIPES
            .iter()
            .find(|(input, _)| input == item)
            .map(|(_, output)| output.clone())
    }
}

impl Default for BindingRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("binding", "Ritual of Binding")
                .with_costs(5000, 500)
                .with_refresh_time(20)
                .with_range(
                    Self::BINDING_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 2, 3),
                    RangeLimits::new(50, 5, 5),
                )
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Dusk)
                        .corners(2, 0, MarkerType::Fire)
                        .parallel(3, 0, MarkerType::Earth)
                        .corners(3, 1, MarkerType::Blank)
                        .build(),
                ),
        }
    }
}

impl Ritual for BindingRitual {
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
        let candidate = ctx
            .entities_in_range(anchor, info, Self::BINDING_RANGE, EntityFilter::Item)
            .into_iter()
            .find_map(|id| {
                let stack = ctx.world.entity(id)?.item()?;
                let bound = Self::bound_form(&stack.item)?;
                Some((id, ItemStack { item: bound, ..stack.clone() }))
            });
        let Some((id, bound)) = candidate else {
            return;
        };

        let mut budget = ctx.budget(info.refresh_cost);
        let done = budget.attempt(|| ctx.world.set_item(id, bound));
        ctx.spend(budget);

        if done {
            log::info!("binding at {} finished", ctx.anchor_pos());
            anchor.request_stop();
        }
    }
}

// =============================================================================
// Dungeon
// =============================================================================

/// Opens a dungeon some distance ahead of the anchor and consumes its own
/// structure on success.
#[derive(Debug)]
pub struct DungeonRitual {
    info: RitualInfo,
}

impl DungeonRitual {
    /// Where the dungeon entrance goes for an anchor.
    #[must_use]
    pub fn entrance(anchor: BlockPos, facing: Direction, distance: i32) -> BlockPos {
        let step = facing.step();
        anchor.saturating_add(
            step.x.saturating_mul(distance),
            step.y.saturating_mul(distance),
            step.z.saturating_mul(distance),
        )
    }
}

impl Default for DungeonRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("dungeon", "Ritual of the Shattered Path")
                .with_tier(1)
                .with_costs(30000, 0)
                .with_refresh_time(20)
                .with_setting("distance", 100)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Dusk)
                        .corners(1, 0, MarkerType::Dusk)
                        .offset(2, 1, 0, MarkerType::Earth)
                        .parallel(3, 0, MarkerType::Fire)
                        .build(),
                ),
        }
    }
}

impl Ritual for DungeonRitual {
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
        let entrance = Self::entrance(origin, ctx.facing(), info.setting_i32("distance"));

        let Some(bounds) = ctx.synthesize(&SynthesisRequest::Dungeon { origin: entrance }) else {
            log::warn!("dungeon at {} could not be generated, retrying", entrance);
            return;
        };
        log::info!("dungeon generated in {:?}", bounds);

        let brick = BlockState::of(BlockId::STONE_BRICKS);
        for pos in structure_positions(info, origin, ctx.facing()) {
            if is_structural(&*ctx.world, origin, pos) {
                ctx.world.replace_block(pos, brick.clone(), owner);
            }
        }
        if !ctx.world.replace_block(origin, BlockState::AIR, owner) {
            log::warn!("dungeon anchor at {} could not be removed", origin);
        }
        anchor.request_stop();
    }
}

// =============================================================================
// Meteor
// =============================================================================

/// What a meteor catalyst summons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeteorKind {
    pub catalyst: ItemId,
    pub filler: BlockId,
    pub radius: u32,
}

/// Calls down a meteor for each catalyst item dropped on the anchor.
#[derive(Debug)]
pub struct MeteorRitual {
    info: RitualInfo,
    kinds: Vec<MeteorKind>,
}

impl MeteorRitual {
    pub const CATALYST_RANGE: &'static str = "catalyst_range";

    /// Meteor kinds by catalyst.
    #[must_use]
    pub fn kinds(&self) -> &[MeteorKind] {
        &self.kinds
    }

    fn kind_for(&self, item: &ItemId) -> Option<&MeteorKind> {
        self.kinds.iter().find(|kind| &kind.catalyst == item)
    }
}

impl Default for MeteorRitual {
    fn default() -> Self {
        let kind = |catalyst: &'static str, filler: &'static str, radius: u32| MeteorKind {
            catalyst: ItemId::from_static(catalyst),
            filler: BlockId::from_static(filler),
            radius,
        };
        Self {
            info: RitualInfo::new("meteor", "Mark of the Falling Tower")
                .with_tier(2)
                .with_costs(1_000_000, 1_000_000)
                .with_refresh_time(20)
                .with_range(
                    Self::CATALYST_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 2, 3),
                    RangeLimits::new(50, 5, 5),
                )
                .with_setting("height", 50)
                .with_components(
                    StructureBuilder::new()
                        .offset(2, 1, 0, MarkerType::Fire)
                        .corners(2, 0, MarkerType::Air)
                        .parallel(4, 0, MarkerType::Earth)
                        .corners(4, 1, MarkerType::Dusk)
                        .build(),
                ),
            kinds: vec![
                kind("iron_block", "iron_ore", 7),
                kind("gold_block", "gold_ore", 5),
                kind("diamond", "diamond_ore", 4),
                kind("stone", "stone", 9),
            ],
        }
    }
}

impl Ritual for MeteorRitual {
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
        let catalyst = ctx
            .entities_in_range(anchor, info, Self::CATALYST_RANGE, EntityFilter::Item)
            .into_iter()
            .find_map(|id| {
                let stack = ctx.world.entity(id)?.item()?;
                let kind = self.kind_for(&stack.item)?;
                Some((id, stack.clone(), kind.clone()))
            });
        let Some((id, mut stack, kind)) = catalyst else {
            return;
        };
        let request = SynthesisRequest::Meteor {
            center: ctx.anchor_pos().add(0, info.setting_i32("height"), 0),
            radius: kind.radius,
            filler: kind.filler,
        };

        let mut budget = ctx.budget(info.refresh_cost);
        budget.attempt(|| {
            if ctx.synthesize(&request).is_none() {
                return false;
            }
            let _ = stack.split(1);
            ctx.world.set_item(id, stack);
            true
        });
        ctx.spend(budget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OwnerId, RitualRng, Vec3};
    use crate::world::memory::{MemoryEssence, MemorySynthesizer, MemoryWorld};
    use crate::world::{Entity, EntityKind, EssenceNetwork};

    const OWNER: OwnerId = OwnerId::from_u128(61);

    fn perform(
        ritual: &mut dyn Ritual,
        anchor: &mut RitualAnchor,
        world: &mut MemoryWorld,
        essence: &mut MemoryEssence,
        synthesizer: &mut MemorySynthesizer,
    ) {
        let mut rng = RitualRng::new(4);
        let mut env = RitualEnv::new(world, essence, &mut rng).with_synthesizer(synthesizer);
        ritual.perform(anchor, &mut env);
    }

    fn drop_item(world: &mut MemoryWorld, item: &'static str, count: u32) -> crate::core::EntityId {
        let stack = ItemStack::new(ItemId::from_static(item), count);
        world
            .spawn_entity(Entity::new(EntityKind::Item(stack), Vec3::new(0.5, 1.0, 0.5)))
            .unwrap()
    }

    #[test]
    fn test_crystal_split_needs_room() {
        let mut world = MemoryWorld::new();
        let cluster = BlockPos::new(0, 1, 0);
        world.set_block(cluster, CrystalSplitRitual::RAW_CLUSTER);
        world.set_block(BlockPos::new(1, 1, 0), BlockId::STONE);
        let mut essence = MemoryEssence::new().with_account(OWNER, 5000);
        let mut synthesizer = MemorySynthesizer::new();
        let mut ritual = CrystalSplitRitual::default();
        let mut anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);

        perform(&mut ritual, &mut anchor, &mut world, &mut essence, &mut synthesizer);
        assert_eq!(world.block_state(cluster).block, CrystalSplitRitual::RAW_CLUSTER);
        assert!(!anchor.is_stop_requested());

        world.set_block(BlockPos::new(1, 1, 0), BlockId::AIR);
        perform(&mut ritual, &mut anchor, &mut world, &mut essence, &mut synthesizer);
        assert!(world.block_state(cluster).is_air());
        assert_eq!(world.block_state(BlockPos::new(0, 1, -1)).block, CrystalSplitRitual::ASPECTS[0]);
        assert_eq!(world.block_state(BlockPos::new(1, 1, 0)).block, CrystalSplitRitual::ASPECTS[1]);
        assert!(anchor.is_stop_requested());
        assert_eq!(essence.balance(OWNER), Some(4000));
    }

    #[test]
    fn test_binding_transforms_one_item() {
        let mut world = MemoryWorld::new();
        let stick = drop_item(&mut world, "stick", 1);
        let sword = drop_item(&mut world, "iron_sword", 1);
        let mut essence = MemoryEssence::new().with_account(OWNER, 5000);
        let mut synthesizer = MemorySynthesizer::new();
        let mut anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);

        perform(&mut BindingRitual::default(), &mut anchor, &mut world, &mut essence, &mut synthesizer);

        let bound = world.entity(sword).and_then(|e| e.item()).map(|s| s.item.clone());
        assert_eq!(bound, Some(ItemId::from_static("bound_blade")));
        let untouched = world.entity(stick).and_then(|e| e.item()).map(|s| s.item.clone());
        assert_eq!(untouched, Some(ItemId::from_static("stick")));
        assert!(anchor.is_stop_requested());
        assert_eq!(essence.balance(OWNER), Some(4500));
    }

    #[test]
    fn test_dungeon_consumes_structure() {
        let mut world = MemoryWorld::new();
        let ritual_info = DungeonRitual::default();
        for pos in structure_positions(ritual_info.info(), BlockPos::ZERO, Direction::North) {
            let marker = MarkerType::Dusk.block();
            world.set_block(pos, marker);
        }
        let mut essence = MemoryEssence::new().with_account(OWNER, 10);
        let mut synthesizer = MemorySynthesizer::new();
        let mut ritual = DungeonRitual::default();
        let mut anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);

        synthesizer.fail = true;
        perform(&mut ritual, &mut anchor, &mut world, &mut essence, &mut synthesizer);
        assert!(!anchor.is_stop_requested());

        synthesizer.fail = false;
        perform(&mut ritual, &mut anchor, &mut world, &mut essence, &mut synthesizer);
        assert!(anchor.is_stop_requested());
        let entrance = BlockPos::new(0, 0, -100);
        assert_eq!(
            synthesizer.requests.last(),
            Some(&SynthesisRequest::Dungeon { origin: entrance })
        );
        assert_eq!(world.block_state(BlockPos::new(1, 0, 0)).block, BlockId::STONE_BRICKS);
        assert_eq!(essence.balance(OWNER), Some(10));
    }

    #[test]
    fn test_meteor_consumes_one_catalyst() {
        let mut world = MemoryWorld::new();
        let iron = drop_item(&mut world, "iron_block", 2);
        let mut essence = MemoryEssence::new().with_account(OWNER, 1_500_000);
        let mut synthesizer = MemorySynthesizer::new();
        let mut ritual = MeteorRitual::default();
        let mut anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);

        perform(&mut ritual, &mut anchor, &mut world, &mut essence, &mut synthesizer);

        assert_eq!(world.entity(iron).and_then(|e| e.item()).map(|s| s.count), Some(1));
        assert_eq!(world.block_state(BlockPos::new(0, 50, 0)).block, BlockId::from_static("iron_ore"));
        assert_eq!(essence.balance(OWNER), Some(500_000));
        assert!(!anchor.is_stop_requested());

        // Not enough essence for a second meteor.
        perform(&mut ritual, &mut anchor, &mut world, &mut essence, &mut synthesizer);
        assert_eq!(synthesizer.requests.len(), 1);
    }
}
