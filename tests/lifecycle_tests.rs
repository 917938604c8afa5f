//! Anchor lifecycle integration tests.
//!
//! These tests drive rituals through `RitualAnchor` the way a host does:
//! build the structure, activate, tick, stop.

use essence_rituals::admin;
use essence_rituals::area::AreaDescriptor;
use essence_rituals::core::{BlockId, BlockPos, Direction, OwnerId, RitualConfig, RitualOverrides, RitualRng};
use essence_rituals::ritual::{
    Activator, FailureReason, Ritual, RitualAnchor, RitualEnv, RitualInfo, RitualRegistry, StopReason,
};
use essence_rituals::world::memory::{MemoryEssence, MemoryWorld};
use essence_rituals::world::{EssenceNetwork, World};

const OWNER: OwnerId = OwnerId::from_u128(0xA11CE);
const ANCHOR: BlockPos = BlockPos::new(0, 64, 0);

fn water_site(registry: &RitualRegistry) -> MemoryWorld {
    let mut world = MemoryWorld::new();
    admin::build_structure(registry, &mut world, ANCHOR, Direction::North, "water").unwrap();
    world
}

fn water_area() -> essence_rituals::core::BlockBox {
    AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 1, 3).bounding_box(ANCHOR)
}

// =============================================================================
// Activation Checks
// =============================================================================

/// Activating without enough essence deducts nothing and changes nothing.
#[test]
fn test_activation_insufficient_essence() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 10);
    let mut rng = RitualRng::new(1);
    let mut anchor = RitualAnchor::new(ANCHOR);

    let result = {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0))
    };

    assert_eq!(result.reason, Some(FailureReason::InsufficientResource));
    assert_eq!(result.context_value, 500);
    assert_eq!(essence.balance(OWNER), Some(10));
    assert!(!anchor.is_active());
    assert_eq!(anchor.owner(), None);
    assert_eq!(world.count_blocks(&water_area(), &BlockId::WATER), 0);

    let notes = anchor.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message.args, vec!["Ritual of the Full Spring".to_string(), "500".to_string()]);
}

/// A missing marker fails the structure check.
#[test]
fn test_activation_requires_structure() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = MemoryWorld::new();
    let mut essence = MemoryEssence::new().with_account(OWNER, 1000);
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR);

    let result = anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0));
    assert_eq!(result.reason, Some(FailureReason::StructureInvalid));
    assert_eq!(env.essence.balance(OWNER), Some(1000));
}

/// Unknown ids, missing accounts, low tiers and disabled rituals.
#[test]
fn test_activation_failure_reasons() {
    let mut registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new();
    let mut rng = RitualRng::new(1);
    let mut anchor = RitualAnchor::new(ANCHOR);

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        let result = anchor.activate(&registry, &mut env, "no_such_ritual", Activator::player(OWNER, 0));
        assert_eq!(result.reason, Some(FailureReason::ActivationFailedGeneric));

        let result = anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0));
        assert_eq!(result.reason, Some(FailureReason::NoOwnerOrAccount));

        let result = anchor.activate(&registry, &mut env, "condor", Activator::player(OWNER, 1));
        assert_eq!(result.reason, Some(FailureReason::InsufficientTier));
        assert_eq!(result.context_value, 2);
    }

    registry.reload(RitualConfig::new().with_ritual("water", RitualOverrides::new().with_enabled(false)));
    essence.set_balance(OWNER, 1000);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let result = anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0));
    assert_eq!(result.reason, Some(FailureReason::RitualDisabled));
    assert!(!anchor.is_active());
}

/// A cooldown blocks activation until it has ticked down.
#[test]
fn test_cooldown_blocks_activation() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 1000);
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR);
    anchor.set_cooldown(3);

    let result = anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0));
    assert_eq!(result.reason, Some(FailureReason::ActivationCancelled));
    assert_eq!(result.context_value, 3);

    for _ in 0..3 {
        anchor.tick(&mut env);
    }
    assert_eq!(anchor.cooldown(), 0);
    assert!(anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0)).is_success());
    assert_eq!(env.essence.balance(OWNER), Some(500));
}

/// The registry finds the ritual whose markers are in place.
#[test]
fn test_activate_matching_structure() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 1000);
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR);

    assert!(anchor.activate_matching(&registry, &mut env, Activator::player(OWNER, 0)).is_success());
    assert_eq!(anchor.active_ritual(), Some("water"));
    assert_eq!(anchor.owner(), Some(OWNER));
}

/// Re-activating stops the running instance with `Superseded`.
#[test]
fn test_reactivation_supersedes() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 1000);
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR);

    assert!(anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0)).is_success());
    anchor.drain_notifications();
    assert!(anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0)).is_success());
    assert_eq!(env.essence.balance(OWNER), Some(0));

    let keys: Vec<String> = anchor.drain_notifications().into_iter().map(|n| n.message.key).collect();
    assert_eq!(
        keys,
        vec![
            "ritual.essence_rituals.stop.superseded".to_string(),
            "ritual.essence_rituals.activate.success".to_string(),
        ]
    );
}

// =============================================================================
// Ticking
// =============================================================================

/// Balance 60 at refresh cost 25 affords two of the nine placements.
#[test]
fn test_water_places_within_budget() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 500);
    let mut rng = RitualRng::new(1);
    let mut anchor = RitualAnchor::new(ANCHOR);

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        assert!(anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0)).is_success());
    }
    assert_eq!(essence.balance(OWNER), Some(0));
    anchor
        .set_range("water_range", BlockPos::new(-1, 1, -1), BlockPos::new(1, 1, 1))
        .unwrap();
    essence.set_balance(OWNER, 60);

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        anchor.tick(&mut env);
    }

    let area = water_area();
    assert_eq!(world.count_blocks(&area, &BlockId::WATER), 2);
    assert_eq!(world.count_blocks(&area, &BlockId::AIR), 7);
    assert_eq!(essence.balance(OWNER), Some(10));
}

/// Performs only run every `refresh_time` ticks.
#[test]
fn test_tick_respects_interval() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 1000);
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR);

    assert!(anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0)).is_success());
    anchor.tick(&mut env);
    assert_eq!(env.essence.balance(OWNER), Some(475));

    for _ in 0..19 {
        anchor.tick(&mut env);
    }
    assert_eq!(anchor.ticks(), 20);
    assert_eq!(env.essence.balance(OWNER), Some(475));
}

/// A redstone signal pauses the ritual without stopping it.
#[test]
fn test_redstone_pauses() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = water_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 1000);
    let mut rng = RitualRng::new(1);
    let mut anchor = RitualAnchor::new(ANCHOR);

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        assert!(anchor.activate(&registry, &mut env, "water", Activator::player(OWNER, 0)).is_success());
        anchor.set_powered(true);
        anchor.tick(&mut env);
    }
    assert!(anchor.is_active());
    assert_eq!(world.block_state(ANCHOR.above()).block, BlockId::AIR);

    anchor.set_powered(false);
    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        anchor.tick(&mut env);
    }
    assert_eq!(world.block_state(ANCHOR.above()).block, BlockId::WATER);
}

// =============================================================================
// Stopping
// =============================================================================

#[derive(Debug)]
struct Countdown {
    info: RitualInfo,
    remaining: u32,
}

impl Ritual for Countdown {
    fn info(&self) -> &RitualInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut RitualInfo {
        &mut self.info
    }

    fn perform(&mut self, anchor: &mut RitualAnchor, _env: &mut RitualEnv<'_>) {
        self.remaining -= 1;
        if self.remaining == 0 {
            anchor.request_stop();
        }
    }
}

fn countdown() -> Box<dyn Ritual> {
    Box::new(Countdown {
        info: RitualInfo::new("countdown", "Countdown").with_refresh_time(1),
        remaining: 2,
    })
}

/// A ritual that requests its own stop is stopped as `Completed`.
#[test]
fn test_request_stop_completes() {
    let mut registry = RitualRegistry::new();
    registry.register(countdown);
    let mut world = MemoryWorld::new();
    let mut essence = MemoryEssence::new().with_account(OWNER, 0);
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR);

    assert!(anchor.activate(&registry, &mut env, "countdown", Activator::player(OWNER, 0)).is_success());
    anchor.drain_notifications();

    anchor.tick(&mut env);
    assert!(anchor.is_active());
    anchor.tick(&mut env);
    assert!(!anchor.is_active());

    let notes = anchor.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, StopReason::Completed.message("Countdown"));
}

/// Stopping an idle anchor is a no-op.
#[test]
fn test_stop_idle_anchor() {
    let mut world = MemoryWorld::new();
    let mut essence = MemoryEssence::new();
    let mut rng = RitualRng::new(1);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(ANCHOR).with_owner(OWNER);

    assert!(!anchor.stop(&mut env, StopReason::BrokenAnchor));
    assert!(anchor.drain_notifications().is_empty());
}
