//! Built-in rituals.
//!
//! Grouped by what they act on:
//!
//! - `terraform`: block placement and removal in an area
//! - `container`: rituals feeding or draining the container above the anchor
//! - `entity`: effects on living entities in range
//! - `travel`: flight and teleportation
//! - `overlay`: temporary blocks tracked per instance and reverted on stop
//! - `oneshot`: single transformations and procedural generation
//!
//! Every ritual follows the same tick shape: create a context, take a
//! budget, act through `OperationBudget::attempt`, spend the budget.

pub mod container;
pub mod entity;
pub mod oneshot;
pub mod overlay;
pub mod terraform;
pub mod travel;

pub use container::{
    AltarBuilderRitual, CobblestoneRitual, CrushingRitual, EllipsoidRitual, FellingRitual, PlacerRitual,
    PumpRitual, ZephyrRitual,
};
pub use entity::{
    AnimalGrowthRitual, ContainmentRitual, FeatheredEarthRitual, FeatheredKnifeRitual, GroundingRitual,
    InterdictionRitual, JumpingRitual, RegenerationRitual, SpeedRitual, WellOfSufferingRitual,
};
pub use oneshot::{BindingRitual, CrystalSplitRitual, DungeonRitual, MeteorRitual};
pub use overlay::{LanternRitual, PhantomBridgeRitual, SuppressionRitual, TrackedBlocks};
pub use terraform::{
    FrostRitual, GreenGroveRitual, HarvestRitual, LavaRitual, MagnetismRitual, VoidRitual, WaterRitual,
};
pub use travel::{CondorRitual, ExpulsionRitual, TeleportRitual};

use serde::{Deserialize, Serialize};

use crate::core::{BlockBox, BlockId, BlockPos};
use crate::ritual::{MarkerType, Ritual, RitualRegistry};
use crate::world::{Entity, EntityKind, ItemStack, World};

/// Offset of the container used by container rituals.
pub const CONTAINER_OFFSET: BlockPos = BlockPos::new(0, 1, 0);

/// Block that must be in range for essence-generating rituals.
pub const ALTAR_BLOCK: BlockId = BlockId::from_static("blood_altar");

/// Resumable position in a scan that spans several refreshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ScanCursor {
    cursor: usize,
}

fn factory<R: Ritual + Default + 'static>() -> Box<dyn Ritual> {
    Box::new(R::default())
}

/// Register every built-in ritual.
pub fn register_all(registry: &mut RitualRegistry) {
    registry.register(factory::<WaterRitual>);
    registry.register(factory::<LavaRitual>);
    registry.register(factory::<CobblestoneRitual>);
    registry.register(factory::<GreenGroveRitual>);
    registry.register(factory::<HarvestRitual>);
    registry.register(factory::<MagnetismRitual>);
    registry.register(factory::<CrushingRitual>);
    registry.register(factory::<FellingRitual>);
    registry.register(factory::<VoidRitual>);
    registry.register(factory::<PlacerRitual>);
    registry.register(factory::<EllipsoidRitual>);
    registry.register(factory::<PumpRitual>);
    registry.register(factory::<FrostRitual>);
    registry.register(factory::<RegenerationRitual>);
    registry.register(factory::<WellOfSufferingRitual>);
    registry.register(factory::<FeatheredKnifeRitual>);
    registry.register(factory::<AnimalGrowthRitual>);
    registry.register(factory::<InterdictionRitual>);
    registry.register(factory::<ContainmentRitual>);
    registry.register(factory::<SpeedRitual>);
    registry.register(factory::<JumpingRitual>);
    registry.register(factory::<GroundingRitual>);
    registry.register(factory::<CondorRitual>);
    registry.register(factory::<FeatheredEarthRitual>);
    registry.register(factory::<ExpulsionRitual>);
    registry.register(factory::<ZephyrRitual>);
    registry.register(factory::<TeleportRitual>);
    registry.register(factory::<SuppressionRitual>);
    registry.register(factory::<PhantomBridgeRitual>);
    registry.register(factory::<LanternRitual>);
    registry.register(factory::<CrystalSplitRitual>);
    registry.register(factory::<BindingRitual>);
    registry.register(factory::<AltarBuilderRitual>);
    registry.register(factory::<DungeonRitual>);
    registry.register(factory::<MeteorRitual>);
}

/// Container position for an anchor.
#[must_use]
pub fn container_pos(anchor: BlockPos) -> BlockPos {
    anchor.offset(CONTAINER_OFFSET)
}

/// Is the position the anchor or a marker block? Area rituals leave those alone.
fn is_structural(world: &dyn World, anchor: BlockPos, pos: BlockPos) -> bool {
    pos == anchor || MarkerType::from_block(&world.block_state(pos).block).is_some()
}

/// Store drops in the container; whatever does not fit is dropped above it.
fn store_drops(world: &mut dyn World, container: BlockPos, drops: Vec<ItemStack>) {
    for stack in drops {
        let rest = world.insert_item(container, stack);
        if !rest.is_empty() {
            world.spawn_entity(Entity::new(EntityKind::Item(rest), container.above().bottom_center()));
        }
    }
}

/// Is there an altar block inside the box?
fn altar_in(world: &dyn World, area: &BlockBox) -> bool {
    area.positions().any(|pos| world.block_state(pos).block == ALTAR_BLOCK)
}
