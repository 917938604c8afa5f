//! Overlay reversal and anchor persistence integration tests.

use essence_rituals::admin;
use essence_rituals::core::{BlockId, BlockPos, Direction, OwnerId, RitualError, RitualRng};
use essence_rituals::ritual::{Activator, AnchorSnapshot, RitualAnchor, RitualEnv, RitualRegistry, StopReason};
use essence_rituals::rituals::SuppressionRitual;
use essence_rituals::world::memory::{MemoryEssence, MemoryWorld};
use essence_rituals::world::{BlockState, EssenceNetwork, World};
use serde_json::json;

const OWNER: OwnerId = OwnerId::from_u128(0xBEEF);

const POOL: [BlockPos; 4] = [
    BlockPos::new(0, 3, 0),
    BlockPos::new(1, 3, 1),
    BlockPos::new(-3, 2, 1),
    BlockPos::new(2, 5, -2),
];
const FLOWING: BlockPos = BlockPos::new(4, 1, 0);

fn flowing_lava() -> BlockState {
    BlockState::of(BlockId::LAVA).with_age(3)
}

/// A suppression site with four water sources and one flowing lava block.
fn flooded_site(registry: &RitualRegistry) -> MemoryWorld {
    let mut world = MemoryWorld::new();
    admin::build_structure(registry, &mut world, BlockPos::ZERO, Direction::North, "suppression").unwrap();
    for pos in POOL {
        world.set_block(pos, BlockId::WATER);
    }
    world.set_block(FLOWING, flowing_lava());
    world
}

fn tracked_count(anchor: &RitualAnchor) -> usize {
    anchor
        .ritual()
        .and_then(|r| r.save_extra())
        .and_then(|extra| extra.as_array().map(Vec::len))
        .unwrap_or(0)
}

// =============================================================================
// Overlay Reversal
// =============================================================================

#[test]
fn test_suppression_restores_everything_on_stop() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = flooded_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 10_100);
    let mut rng = RitualRng::new(9);
    let mut anchor = RitualAnchor::new(BlockPos::ZERO);

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        assert!(anchor.activate(&registry, &mut env, "suppression", Activator::player(OWNER, 0)).is_success());
        anchor.tick(&mut env);
    }
    assert_eq!(tracked_count(&anchor), 5);
    for pos in POOL {
        assert_eq!(world.block_state(pos).block, SuppressionRitual::PLACEHOLDER);
    }
    assert_eq!(essence.balance(OWNER), Some(90));

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        assert!(anchor.stop(&mut env, StopReason::BrokenComponent));
    }
    for pos in POOL {
        assert_eq!(world.block_state(pos).block, BlockId::WATER);
    }
    assert_eq!(world.block_state(FLOWING), flowing_lava());
}

#[test]
fn test_suppression_releases_positions_leaving_range() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = flooded_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 10_100);
    let mut rng = RitualRng::new(9);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(BlockPos::ZERO);

    assert!(anchor.activate(&registry, &mut env, "suppression", Activator::player(OWNER, 0)).is_success());
    anchor.tick(&mut env);
    assert_eq!(tracked_count(&anchor), 5);

    anchor
        .set_range("suppression_range", BlockPos::ZERO, BlockPos::new(0, 0, 3))
        .unwrap();
    anchor.tick(&mut env);

    assert_eq!(tracked_count(&anchor), 1);
    assert_eq!(env.world.block_state(POOL[0]).block, SuppressionRitual::PLACEHOLDER);
    assert_eq!(env.world.block_state(POOL[1]).block, BlockId::WATER);
    assert_eq!(env.world.block_state(FLOWING), flowing_lava());
}

// =============================================================================
// Snapshots
// =============================================================================

/// A restored anchor carries the tracked set and reverts it on stop.
#[test]
fn test_snapshot_roundtrip_keeps_overlay() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = flooded_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 10_100);
    let mut rng = RitualRng::new(9);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(BlockPos::ZERO);

    assert!(anchor.activate(&registry, &mut env, "suppression", Activator::player(OWNER, 0)).is_success());
    anchor
        .set_range("suppression_range", BlockPos::ZERO, BlockPos::new(0, 0, 8))
        .unwrap();
    anchor.tick(&mut env);

    let text = anchor.to_json().unwrap();
    let mut restored = RitualAnchor::from_json(&text, &registry).unwrap();
    assert_eq!(restored.snapshot(), anchor.snapshot());
    assert_eq!(restored.active_ritual(), Some("suppression"));
    assert_eq!(restored.owner(), Some(OWNER));
    assert_eq!(restored.ticks(), 1);
    assert_eq!(restored.range_override("suppression_range"), anchor.range_override("suppression_range"));
    assert_eq!(tracked_count(&restored), 5);

    assert!(restored.stop(&mut env, StopReason::Deactivated));
    for pos in POOL {
        assert_eq!(env.world.block_state(pos).block, BlockId::WATER);
    }
}

#[test]
fn test_idle_snapshot_has_no_active_section() {
    let anchor = RitualAnchor::new(BlockPos::new(3, 4, 5)).with_owner(OWNER).with_facing(Direction::East);
    let value = serde_json::to_value(anchor.snapshot()).unwrap();
    assert!(value.get("active").is_none());

    let registry = RitualRegistry::with_default_rituals();
    let restored = RitualAnchor::from_json(&value.to_string(), &registry).unwrap();
    assert_eq!(restored.pos(), BlockPos::new(3, 4, 5));
    assert_eq!(restored.facing(), Direction::East);
    assert!(!restored.is_active());
}

/// Unreadable ritual state is dropped; the ritual restarts with nothing tracked.
#[test]
fn test_unreadable_extra_resets_state() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = flooded_site(&registry);
    let mut essence = MemoryEssence::new().with_account(OWNER, 10_100);
    let mut rng = RitualRng::new(9);
    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let mut anchor = RitualAnchor::new(BlockPos::ZERO);

    assert!(anchor.activate(&registry, &mut env, "suppression", Activator::player(OWNER, 0)).is_success());
    anchor.tick(&mut env);

    let mut snapshot: AnchorSnapshot = anchor.snapshot();
    if let Some(active) = snapshot.active.as_mut() {
        active.extra = Some(json!("not a list"));
    }
    let restored = RitualAnchor::restore(snapshot, &registry).unwrap();
    assert_eq!(restored.active_ritual(), Some("suppression"));
    assert_eq!(tracked_count(&restored), 0);
}

#[test]
fn test_snapshot_errors() {
    let registry = RitualRegistry::with_default_rituals();

    let err = RitualAnchor::from_json("{ not json", &registry).unwrap_err();
    assert!(matches!(err, RitualError::Snapshot(_)));

    let unknown = json!({
        "pos": { "x": 0, "y": 0, "z": 0 },
        "active": { "ritual": "vanished" }
    });
    let err = RitualAnchor::from_json(&unknown.to_string(), &registry).unwrap_err();
    assert!(matches!(err, RitualError::UnknownRitual(ref id) if id == "vanished"));
}
