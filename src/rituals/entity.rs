//! Rituals acting on living entities in range.
//!
//! Every affected entity is one paid operation. Entities are read through
//! their snapshot and changed through the world's checked operations.

use super::altar_in;
use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockPos, EntityId, Vec3};
use crate::ritual::{MarkerType, Ritual, RitualAnchor, RitualContext, RitualEnv, RitualInfo, StructureBuilder};
use crate::world::{EntityFilter, StatusEffect, World};

/// A setting stored in tenths, as a float.
fn tenths(info: &RitualInfo, key: &str) -> f64 {
    info.setting(key) as f64 / 10.0
}

// =============================================================================
// Regeneration
// =============================================================================

/// Grants regeneration to hurt living entities.
#[derive(Debug)]
pub struct RegenerationRitual {
    info: RitualInfo,
}

impl RegenerationRitual {
    pub const HEAL_RANGE: &'static str = "heal_range";
}

impl Default for RegenerationRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("regeneration", "Ritual of Regeneration")
                .with_costs(25000, 10)
                .with_refresh_time(100)
                .with_range(
                    Self::HEAL_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-15, -15, -15), 31),
                    RangeLimits::new(35000, 20, 20),
                )
                .with_setting("duration", 200)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Water)
                        .corners(1, 0, MarkerType::Air)
                        .parallel(2, 1, MarkerType::Dawn)
                        .build(),
                ),
        }
    }
}

impl Ritual for RegenerationRitual {
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
        let duration = info.setting_u32("duration");
        let hurt = ctx.entities_in_range_where(anchor, info, Self::HEAL_RANGE, EntityFilter::Living, |e| {
            e.health < e.max_health && !e.has_effect(StatusEffect::Regeneration)
        });

        let mut budget = ctx.budget(info.refresh_cost);
        for id in hurt {
            if budget.is_exhausted() {
                break;
            }
            budget.attempt(|| ctx.world.add_effect(id, StatusEffect::Regeneration, duration, 0));
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Essence from damage
// =============================================================================

/// Hurts every target once and credits essence per hit, up to the altar's
/// capacity. Returns the number of hits.
fn sacrifice(
    ctx: &mut RitualContext<'_>,
    info: &RitualInfo,
    targets: Vec<EntityId>,
    damage: f32,
) -> u64 {
    let mut budget = ctx.budget(info.refresh_cost);
    for id in targets {
        if budget.is_exhausted() {
            break;
        }
        budget.attempt(|| ctx.world.hurt(id, damage));
    }
    let hits = budget.performed();
    ctx.spend(budget);

    if hits > 0 {
        let per_hit = info.setting("essence_per_hit");
        let gained = ctx.credit(per_hit * hits as i64, info.setting("altar_capacity"));
        log::debug!("{} hits gave {} essence", hits, gained);
    }
    hits
}

/// Hurts non-player creatures near a blood altar to fill it.
#[derive(Debug)]
pub struct WellOfSufferingRitual {
    info: RitualInfo,
}

impl WellOfSufferingRitual {
    pub const DAMAGE_RANGE: &'static str = "damage_range";
    pub const ALTAR_RANGE: &'static str = "altar_range";
}

impl Default for WellOfSufferingRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("well_of_suffering", "Well of Suffering")
                .with_costs(40000, 2)
                .with_refresh_time(25)
                .with_range(
                    Self::DAMAGE_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-10, -10, -10), 21),
                    RangeLimits::new(10000, 15, 15),
                )
                .with_range(
                    Self::ALTAR_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-5, -10, -5), 11, 21, 11),
                    RangeLimits::new(3000, 15, 15),
                )
                .with_setting("damage", 1)
                .with_setting("essence_per_hit", 25)
                .with_setting("altar_capacity", 10000)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Fire)
                        .corners(1, 0, MarkerType::Fire)
                        .corners(2, -1, MarkerType::Dusk)
                        .build(),
                ),
        }
    }
}

impl Ritual for WellOfSufferingRitual {
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
        let Some(altar_area) = ctx.range_box(anchor, info, Self::ALTAR_RANGE) else {
            return;
        };
        if !altar_in(&*ctx.world, &altar_area) {
            return;
        }
        let victims = ctx.entities_in_range(anchor, info, Self::DAMAGE_RANGE, EntityFilter::NonPlayerLiving);
        sacrifice(&mut ctx, info, victims, info.setting("damage") as f32);
    }
}

/// Draws blood from healthy players near a blood altar.
#[derive(Debug)]
pub struct FeatheredKnifeRitual {
    info: RitualInfo,
}

impl FeatheredKnifeRitual {
    pub const DAMAGE_RANGE: &'static str = "damage_range";
    pub const ALTAR_RANGE: &'static str = "altar_range";
}

impl Default for FeatheredKnifeRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("feathered_knife", "Ritual of the Feathered Knife")
                .with_costs(25000, 20)
                .with_refresh_time(20)
                .with_range(
                    Self::DAMAGE_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-15, -20, -15), 31),
                    RangeLimits::new(30000, 15, 20),
                )
                .with_range(
                    Self::ALTAR_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-5, -10, -5), 11, 21, 11),
                    RangeLimits::new(3000, 15, 15),
                )
                .with_setting("damage", 1)
                .with_setting("health_threshold_percent", 30)
                .with_setting("essence_per_hit", 100)
                .with_setting("altar_capacity", 10000)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Dusk)
                        .parallel(2, 0, MarkerType::Air)
                        .corners(1, -1, MarkerType::Fire)
                        .corners(2, -1, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for FeatheredKnifeRitual {
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
        let Some(altar_area) = ctx.range_box(anchor, info, Self::ALTAR_RANGE) else {
            return;
        };
        if !altar_in(&*ctx.world, &altar_area) {
            return;
        }
        let threshold = info.setting("health_threshold_percent") as f32 / 100.0;
        let donors = ctx.entities_in_range_where(anchor, info, Self::DAMAGE_RANGE, EntityFilter::Player, |e| {
            e.max_health > 0.0 && e.health / e.max_health > threshold
        });
        sacrifice(&mut ctx, info, donors, info.setting("damage") as f32);
    }
}

// =============================================================================
// Animal growth
// =============================================================================

/// Ages baby animals toward adulthood.
#[derive(Debug)]
pub struct AnimalGrowthRitual {
    info: RitualInfo,
}

impl AnimalGrowthRitual {
    pub const GROWTH_RANGE: &'static str = "growth_range";
}

impl Default for AnimalGrowthRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("animal_growth", "Ritual of the Shepherd")
                .with_costs(10000, 2)
                .with_refresh_time(20)
                .with_range(
                    Self::GROWTH_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-2, 1, -2), 5, 2, 5),
                    RangeLimits::new(500, 10, 10),
                )
                .with_setting("age_step", 200)
                .with_components(
                    StructureBuilder::new()
                        .parallel(2, 0, MarkerType::Dusk)
                        .parallel(1, 0, MarkerType::Water)
                        .corners(1, 0, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for AnimalGrowthRitual {
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
        let step = info.setting_i32("age_step");
        let babies =
            ctx.entities_in_range_where(anchor, info, Self::GROWTH_RANGE, EntityFilter::Animal, |e| e.is_baby());

        let mut budget = ctx.budget(info.refresh_cost);
        for id in babies {
            if budget.is_exhausted() {
                break;
            }
            let Some(age) = ctx.world.entity(id).map(|e| e.age) else {
                continue;
            };
            budget.attempt(|| ctx.world.set_age(id, (age + step).min(0)));
        }
        ctx.spend(budget);
    }
}

// =============================================================================
// Movement
// =============================================================================

/// Pushes living entities other than the owner away from the anchor.
#[derive(Debug)]
pub struct InterdictionRitual {
    info: RitualInfo,
}

impl InterdictionRitual {
    pub const INTERDICTION_RANGE: &'static str = "interdiction_range";
}

impl Default for InterdictionRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("interdiction", "Interdiction Ritual")
                .with_costs(1000, 1)
                .with_refresh_time(1)
                .with_range(
                    Self::INTERDICTION_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-2, -2, -2), 5),
                    RangeLimits::new(200, 10, 10),
                )
                .with_setting("push", 5)
                .with_components(StructureBuilder::new().parallel(1, 0, MarkerType::Air).build()),
        }
    }
}

impl Ritual for InterdictionRitual {
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
        let center = ctx.anchor_pos().center();
        let push = tenths(info, "push");
        let intruders = ctx.entities_in_range_where(anchor, info, Self::INTERDICTION_RANGE, EntityFilter::Living, |e| {
            e.player() != Some(owner)
        });

        let mut budget = ctx.budget(info.refresh_cost);
        for id in intruders {
            if budget.is_exhausted() {
                break;
            }
            let Some(pos) = ctx.world.entity(id).map(|e| e.pos) else {
                continue;
            };
            let away = pos.sub(center).normalize().scale(push);
            budget.attempt(|| ctx.world.set_velocity(id, away));
        }
        ctx.spend(budget);
    }
}

/// Pulls creatures toward the anchor.
#[derive(Debug)]
pub struct ContainmentRitual {
    info: RitualInfo,
}

impl ContainmentRitual {
    pub const CONTAINMENT_RANGE: &'static str = "containment_range";
}

impl Default for ContainmentRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("containment", "Ritual of Containment")
                .with_costs(2000, 1)
                .with_refresh_time(1)
                .with_range(
                    Self::CONTAINMENT_RANGE,
                    AreaDescriptor::cube(BlockPos::new(-3, -3, -3), 7),
                    RangeLimits::new(1000, 10, 10),
                )
                .with_setting("pull", 3)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .parallel(2, 0, MarkerType::Blank)
                        .corners(2, 0, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for ContainmentRitual {
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
        let center = ctx.anchor_pos().center();
        let pull = tenths(info, "pull");
        let creatures = ctx.entities_in_range(anchor, info, Self::CONTAINMENT_RANGE, EntityFilter::NonPlayerLiving);

        let mut budget = ctx.budget(info.refresh_cost);
        for id in creatures {
            if budget.is_exhausted() {
                break;
            }
            let Some(pos) = ctx.world.entity(id).map(|e| e.pos) else {
                continue;
            };
            let toward = center.sub(pos).normalize().scale(pull);
            budget.attempt(|| ctx.world.set_velocity(id, toward));
        }
        ctx.spend(budget);
    }
}

/// Launches entities in the direction the anchor faces.
#[derive(Debug)]
pub struct SpeedRitual {
    info: RitualInfo,
}

impl SpeedRitual {
    pub const SPEED_RANGE: &'static str = "speed_range";
}

impl Default for SpeedRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("speed", "Ritual of Speed")
                .with_costs(1000, 5)
                .with_refresh_time(1)
                .with_range(
                    Self::SPEED_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-2, 1, -2), 5, 3, 5),
                    RangeLimits::new(100, 5, 5),
                )
                .with_setting("speed", 15)
                .with_setting("lift", 3)
                .with_components(
                    StructureBuilder::new()
                        .offset(2, 1, 0, MarkerType::Air)
                        .cross(3, 0, MarkerType::Air)
                        .build(),
                ),
        }
    }
}

impl Ritual for SpeedRitual {
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
        let launch = ctx
            .facing()
            .unit()
            .scale(tenths(info, "speed"))
            .add(Vec3::new(0.0, tenths(info, "lift"), 0.0));
        let riders = ctx.entities_in_range(anchor, info, Self::SPEED_RANGE, EntityFilter::Living);

        let mut budget = ctx.budget(info.refresh_cost);
        for id in riders {
            if budget.is_exhausted() {
                break;
            }
            budget.attempt(|| ctx.world.set_velocity(id, launch));
        }
        ctx.spend(budget);
    }
}

/// Throws grounded entities upward.
#[derive(Debug)]
pub struct JumpingRitual {
    info: RitualInfo,
}

impl JumpingRitual {
    pub const JUMP_RANGE: &'static str = "jump_range";
}

impl Default for JumpingRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("jumping", "Ritual of the High Jump")
                .with_costs(5000, 5)
                .with_refresh_time(1)
                .with_range(
                    Self::JUMP_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 1, 3),
                    RangeLimits::new(50, 5, 5),
                )
                .with_setting("jump", 13)
                .with_components(
                    StructureBuilder::new()
                        .corners(1, 0, MarkerType::Air)
                        .corners(2, -1, MarkerType::Air)
                        .build(),
                ),
        }
    }
}

impl Ritual for JumpingRitual {
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
        let jump = tenths(info, "jump");
        let grounded =
            ctx.entities_in_range_where(anchor, info, Self::JUMP_RANGE, EntityFilter::Living, |e| e.on_ground);

        let mut budget = ctx.budget(info.refresh_cost);
        for id in grounded {
            if budget.is_exhausted() {
                break;
            }
            let Some(velocity) = ctx.world.entity(id).map(|e| e.velocity) else {
                continue;
            };
            budget.attempt(|| ctx.world.set_velocity(id, Vec3::new(velocity.x, jump, velocity.z)));
        }
        ctx.spend(budget);
    }
}

/// Clears levitation and drags airborne entities down.
#[derive(Debug)]
pub struct GroundingRitual {
    info: RitualInfo,
}

impl GroundingRitual {
    pub const GROUNDING_RANGE: &'static str = "grounding_range";
}

impl Default for GroundingRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("grounding", "Ritual of Grounding")
                .with_costs(5000, 2)
                .with_refresh_time(1)
                .with_range(
                    Self::GROUNDING_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-10, 0, -10), 21, 30, 21),
                    RangeLimits::new(20000, 40, 30),
                )
                .with_setting("drag", 5)
                .with_components(
                    StructureBuilder::new()
                        .parallel(1, 0, MarkerType::Earth)
                        .corners(1, 0, MarkerType::Dusk)
                        .parallel(2, 0, MarkerType::Earth)
                        .build(),
                ),
        }
    }
}

impl Ritual for GroundingRitual {
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
        let drag = tenths(info, "drag");
        let floating = ctx.entities_in_range_where(anchor, info, Self::GROUNDING_RANGE, EntityFilter::Living, |e| {
            !e.on_ground || e.has_effect(StatusEffect::Levitation)
        });

        let mut budget = ctx.budget(info.refresh_cost);
        for id in floating {
            if budget.is_exhausted() {
                break;
            }
            let Some((velocity, on_ground)) = ctx.world.entity(id).map(|e| (e.velocity, e.on_ground)) else {
                continue;
            };
            budget.attempt(|| {
                let cleared = ctx.world.remove_effect(id, StatusEffect::Levitation);
                let dragged = !on_ground
                    && ctx
                        .world
                        .set_velocity(id, Vec3::new(velocity.x, velocity.y.min(-drag), velocity.z));
                cleared || dragged
            });
        }
        ctx.spend(budget);
    }
}

/// Cancels fall damage in its range.
#[derive(Debug)]
pub struct FeatheredEarthRitual {
    info: RitualInfo,
}

impl FeatheredEarthRitual {
    pub const FALL_RANGE: &'static str = "fall_range";
}

impl Default for FeatheredEarthRitual {
    fn default() -> Self {
        Self {
            info: RitualInfo::new("feathered_earth", "Ritual of the Feathered Earth")
                .with_costs(5000, 1)
                .with_refresh_time(1)
                .with_range(
                    Self::FALL_RANGE,
                    AreaDescriptor::rectangle(BlockPos::new(-25, 0, -25), 51, 30, 51),
                    RangeLimits::new(100_000, 30, 30),
                )
                .with_components(
                    StructureBuilder::new()
                        .corners(1, 0, MarkerType::Air)
                        .parallel(2, 0, MarkerType::Earth)
                        .corners(3, 1, MarkerType::Air)
                        .build(),
                ),
        }
    }
}

impl Ritual for FeatheredEarthRitual {
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
        let falling =
            ctx.entities_in_range_where(anchor, info, Self::FALL_RANGE, EntityFilter::Living, |e| e.fall_distance > 0.0);

        let mut budget = ctx.budget(info.refresh_cost);
        for id in falling {
            if budget.is_exhausted() {
                break;
            }
            budget.attempt(|| ctx.world.set_fall_distance(id, 0.0));
        }
        ctx.spend(budget);
    }
}
