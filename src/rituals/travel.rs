//! Flight and teleportation.

use im::OrdSet;
use serde::{Deserialize, Serialize};

use super::container_pos;
use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockPos, EntityId, ItemId, Vec3};
use crate::ritual::{
    MarkerType, Ritual, RitualAnchor, RitualContext, RitualEnv, RitualInfo, StopReason, StructureBuilder,
};
use crate::world::{EntityFilter, World};

// =============================================================================
// Condor
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct FlightState {
    tracked: OrdSet<EntityId>,
}

/// Grants flight to players in range and revokes it when they leave, the
/// upkeep cannot be paid, or the ritual stops.
///
/// Only players this instance granted flight to are tracked; flight from
/// other sources is never touched.
#[derive(Debug)]
pub struct CondorRitual {
    info: RitualInfo,
    state: FlightState,
}

impl CondorRitual {
    pub const FLIGHT_RANGE: &'static str = "flight_range";

    /// Is the entity flying thanks to this ritual?
    #[must_use]
    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.state.tracked.contains(&id)
    }

    fn revoke(&mut self, world: &mut dyn World, id: EntityId) {
        self.state.tracked.remove(&id);
        world.set_may_fly(id, false);
        log::debug!("condor revoked flight from {}", id);
    }
}

impl Default for CondorRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("condor", "Reverence of the Condor")
                .with_tier(2)
                .with_costs(1_000_000, 5)
                .with_refresh_time(10)
                .with_range(
                    Self::FLIGHT_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-10, 0, -10), 21, 30, 21),
                    RangeLimits::new(1_000_000, 100, 100),
                )
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Air)
                        .corners(1, 0, MarkerType::Dawn)
                        .offset(2, 1, 0, MarkerType::Air)
                        .parallel(3, 1, MarkerType::Dusk)
                        .build(),
                ),
            state: FlightState::default(),
        }
    }
}

impl Ritual for CondorRitual {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) {
        let Some(mut ctx) = RitualContext::create(anchor, env, 0) else {
            return;
        };
        let cost = self.info.refresh_cost;
        let in_range = ctx.entities_in_range(anchor, &self.info, Self::FLIGHT_RANGE, EntityFilter::Player);

        let departed: Vec<EntityId> = self
            .state
            .tracked
            .iter()
            .copied()
            .filter(|id| !in_range.contains(id))
            .collect();
        for id in departed {
            self.revoke(&mut *ctx.world, id);
        }

        let mut budget = ctx.budget(cost);
        for id in in_range {
            if self.is_tracked(id) {
                if !budget.attempt(|| true) {
                    self.revoke(&mut *ctx.world, id);
                }
                continue;
            }
            let flying = ctx.world.entity(id).is_some_and(|e| e.may_fly);
            if !flying && budget.attempt(|| ctx.world.set_may_fly(id, true)) {
                self.state.tracked.insert(id);
            }
        }
        ctx.spend(budget);
    }

    fn stop(&mut self, _anchor: &RitualAnchor, env: &mut RitualEnv<'_>, _reason: StopReason) {
        let tracked: Vec<EntityId> = self.state.tracked.iter().copied().collect();
        for id in tracked {
            self.revoke(&mut *env.world, id);
        }
    }

    fn save_extra(&self) -> Option<serde_json::Value> {
        serde_json::to_value(&self.state).ok()
    }

    fn load_extra(&mut self, extra: &serde_json::Value) -> Result<(), serde_json::Error> {
        self.state = FlightState::deserialize(extra)?;
        Ok(())
    }
}

// =============================================================================
// Expulsion
// =============================================================================

/// Teleports players other than the owner out of its range.
#[derive(Debug)]
pub struct ExpulsionRitual {
    info: RitualInfo,
}

impl ExpulsionRitual {
    pub const EXPULSION_RANGE: &'static str = "expulsion_range";
    /// Destinations tried per player before giving up for this refresh.
    pub const TELEPORT_TRIES: u32 = 4;
}

impl Default for ExpulsionRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("expulsion", "Aura of Expulsion")
                .with_costs(10000, 1000)
                .with_refresh_time(20)
                .with_range(
                    Self::EXPULSION_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-12, -12, -12), 25),
                    RangeLimits::new(15625, 25, 25),
                )
                .with_setting("teleport_distance", 20)
                .with_components(
                    StructureBuilder::new()
                        .parallel(2, 0, MarkerType::Earth)
                        .corners(2, 0, MarkerType::Air)
                        .parallel(4, 0, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for ExpulsionRitual {
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
        let owner = ctx.owner();
        let Some(bounds) = ctx.range_box(anchor, info, Self::EXPULSION_RANGE) else {
            return;
        };
        let reach = bounds.size_x().max(bounds.size_z()) as f64 / 2.0 + info.setting("teleport_distance") as f64;
        let center = bounds.center();
        let intruders = ctx.entities_in_range_where(anchor, info, Self::EXPULSION_RANGE, EntityFilter::Player, |e| {
            e.player() != Some(owner)
        });

        let mut budget = ctx.budget(info.refresh_cost);
        for id in intruders {
            if budget.is_exhausted() {
                break;
            }
            let Some(y) = ctx.world.entity(id).map(|e| e.pos.y) else {
                continue;
            };
            let expelled = budget.attempt(|| {
                (0..Self::TELEPORT_TRIES).any(|_| {
                    let angle = ctx.rng.gen_angle();
                    let target = Vec3::new(center.x + angle.cos() * reach, y, center.z + angle.sin() * reach);
                    ctx.world.teleport(id, target)
                })
            });
            if !expelled {
                log::debug!("could not expel {} from {}", id, ctx.anchor_pos());
            }
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Teleport
// =============================================================================

/// Sends living entities standing on the anchor to the position bound to
/// the focus in its container.
#[derive(Debug)]
pub struct TeleportRitual {
    info: RitualInfo,
}

impl TeleportRitual {
    pub const TELEPORT_RANGE: &'static str = "teleport_range";
    pub const FOCUS: ItemId = ItemId::from_static("teleposition_focus");
}

impl Default for TeleportRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("teleport", "Ritual of the Teleporter")
                .with_costs(50000, 1000)
                .with_refresh_time(20)
                .with_range(
                    Self::TELEPORT_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 2, 3),
                    RangeLimits::new(50, 5, 5),
                )
                .with_components(
                    StructureBuilder::new()
                        .corners(1, 0, MarkerType::Air)
                        .parallel(2, 0, MarkerType::Dusk)
                        .corners(2, 0, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for TeleportRitual {
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
        let destination = ctx
            .world
            .container_items(container)
            .into_iter()
            .filter(|s| s.item == Self::FOCUS)
            .find_map(|s| s.bound_pos);
        let Some(destination) = destination else {
            return;
        };
        let travellers = ctx.entities_in_range(anchor, info, Self::TELEPORT_RANGE, EntityFilter::Living);

        let mut budget = ctx.budget(info.refresh_cost);
        for id in travellers {
            if budget.is_exhausted() {
                break;
            }
            budget.attempt(|| ctx.world.teleport(id, destination.bottom_center()));
        }
        ctx.spend(budget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OwnerId, RitualRng};
    use crate::world::memory::{MemoryEssence, MemoryWorld, DEFAULT_CONTAINER_SLOTS};
    use crate::world::{Entity, EntityKind, EssenceNetwork, ItemStack};

    const OWNER: OwnerId = OwnerId::from_u128(41);

    fn perform(ritual: &mut dyn Ritual, world: &mut MemoryWorld, essence: &mut MemoryEssence) {
        let mut rng = RitualRng::new(5);
        let mut env = RitualEnv::new(world, essence, &mut rng);
        let mut anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);
        ritual.perform(&mut anchor, &mut env);
    }

    fn player(world: &mut MemoryWorld, owner: OwnerId, pos: Vec3) -> EntityId {
        world.spawn_entity(Entity::new(EntityKind::Player(owner), pos)).unwrap()
    }

    #[test]
    fn test_condor_grants_and_revokes() {
        let mut world = MemoryWorld::new();
        let id = player(&mut world, OWNER, Vec3::new(2.5, 1.0, 2.5));
        let mut essence = MemoryEssence::new().with_account(OWNER, 12);
        let mut ritual = CondorRitual::default();

        perform(&mut ritual, &mut world, &mut essence);
        assert!(world.entity(id).unwrap().may_fly);
        assert!(ritual.is_tracked(id));

        // Upkeep for the second refresh, nothing left for the third.
        perform(&mut ritual, &mut world, &mut essence);
        assert!(world.entity(id).unwrap().may_fly);
        perform(&mut ritual, &mut world, &mut essence);
        assert!(!world.entity(id).unwrap().may_fly);
        assert!(!ritual.is_tracked(id));
        assert_eq!(essence.balance(OWNER), Some(2));
    }

    #[test]
    fn test_condor_leaves_foreign_flight_alone() {
        let mut world = MemoryWorld::new();
        let id = player(&mut world, OWNER, Vec3::new(2.5, 1.0, 2.5));
        world.set_may_fly(id, true);
        let mut essence = MemoryEssence::new().with_account(OWNER, 100);
        let mut ritual = CondorRitual::default();

        perform(&mut ritual, &mut world, &mut essence);
        assert!(!ritual.is_tracked(id));

        world.entity_mut(id).unwrap().pos = Vec3::new(100.5, 1.0, 0.5);
        perform(&mut ritual, &mut world, &mut essence);
        assert!(world.entity(id).unwrap().may_fly);
        assert_eq!(essence.balance(OWNER), Some(100));
    }

    #[test]
    fn test_condor_revokes_on_departure_and_stop() {
        let mut world = MemoryWorld::new();
        let leaving = player(&mut world, OWNER, Vec3::new(2.5, 1.0, 2.5));
        let staying = player(&mut world, OwnerId::from_u128(2), Vec3::new(-2.5, 1.0, 2.5));
        let mut essence = MemoryEssence::new().with_account(OWNER, 100);
        let mut ritual = CondorRitual::default();

        perform(&mut ritual, &mut world, &mut essence);
        world.entity_mut(leaving).unwrap().pos = Vec3::new(50.5, 1.0, 0.5);
        perform(&mut ritual, &mut world, &mut essence);
        assert!(!world.entity(leaving).unwrap().may_fly);
        assert!(world.entity(staying).unwrap().may_fly);

        let saved = ritual.save_extra().unwrap();
        let mut restored = CondorRitual::default();
        restored.load_extra(&saved).unwrap();
        assert!(restored.is_tracked(staying));

        let mut rng = RitualRng::new(0);
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        let anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);
        restored.stop(&anchor, &mut env, StopReason::Deactivated);
        assert!(!world.entity(staying).unwrap().may_fly);
    }

    #[test]
    fn test_expulsion_spares_owner() {
        let mut world = MemoryWorld::new();
        let owner = player(&mut world, OWNER, Vec3::new(1.5, 0.0, 1.5));
        let stranger = player(&mut world, OwnerId::from_u128(9), Vec3::new(-1.5, 0.0, 1.5));
        let mut essence = MemoryEssence::new().with_account(OWNER, 1500);

        perform(&mut ExpulsionRitual::default(), &mut world, &mut essence);

        assert_eq!(world.entity(owner).unwrap().pos, Vec3::new(1.5, 0.0, 1.5));
        let moved = world.entity(stranger).unwrap().pos;
        let bounds = AreaDescriptor::cube(BlockPos::new(-12, -12, -12), 25).bounding_box(BlockPos::ZERO);
        assert!(!bounds.contains_point(moved));
        assert_eq!(essence.balance(OWNER), Some(500));
    }

    #[test]
    fn test_teleport_needs_bound_focus() {
        let mut world = MemoryWorld::new();
        world.add_container(BlockPos::new(0, 1, 0), DEFAULT_CONTAINER_SLOTS);
        let traveller = world
            .spawn_entity(Entity::new(EntityKind::Animal, Vec3::new(1.5, 1.0, 0.5)))
            .unwrap();
        let mut essence = MemoryEssence::new().with_account(OWNER, 5000);
        let mut ritual = TeleportRitual::default();

        world.insert_item(BlockPos::new(0, 1, 0), ItemStack::new(TeleportRitual::FOCUS, 1));
        perform(&mut ritual, &mut world, &mut essence);
        assert_eq!(world.entity(traveller).unwrap().pos, Vec3::new(1.5, 1.0, 0.5));

        let target = BlockPos::new(200, 64, -30);
        world.insert_item(BlockPos::new(0, 1, 0), ItemStack::new(TeleportRitual::FOCUS, 1).bound_to(target));
        perform(&mut ritual, &mut world, &mut essence);
        assert_eq!(world.entity(traveller).unwrap().pos, target.bottom_center());
        assert_eq!(essence.balance(OWNER), Some(4000));
    }
}
