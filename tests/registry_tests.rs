//! Registry, configuration and imperfect ritual integration tests.

use essence_rituals::area::RangeLimits;
use essence_rituals::imperfect::ImperfectRitual;
use essence_rituals::core::{BlockId, BlockPos, ImperfectStats, OwnerId, RitualConfig, RitualRng, TagId};
use essence_rituals::ritual::{FailureReason, RitualRegistry};
use essence_rituals::world::memory::{MemoryEssence, MemoryWorld};
use essence_rituals::world::{BlockState, EssenceNetwork, World};
use essence_rituals::RitualEnv;

const OWNER: OwnerId = OwnerId::from_u128(314);

// =============================================================================
// Built-in Rituals
// =============================================================================

#[test]
fn test_default_registry_contents() {
    let registry = RitualRegistry::with_default_rituals();
    assert_eq!(registry.len(), 35);
    assert_eq!(registry.imperfect().len(), 6);

    let ids: Vec<&str> = registry.ids().collect();
    assert_eq!(ids.first(), Some(&"water"));
    assert_eq!(ids.last(), Some(&"meteor"));
    for id in ["magnetism", "suppression", "condor", "altar_builder", "dungeon"] {
        assert!(registry.contains(id), "missing `{id}`");
    }
}

#[test]
fn test_templates_are_consistent() {
    let registry = RitualRegistry::with_default_rituals();
    for info in registry.iter() {
        assert!(info.enabled, "`{}` disabled by default", info.id);
        assert!(info.refresh_time > 0, "`{}` has no interval", info.id);
        assert!(info.activation_cost >= 0 && info.refresh_cost >= 0);
        assert_eq!(info.info_keys().len(), info.ranges().len() + 1);
        for range in info.ranges() {
            assert_eq!(
                range.limits.check(&range.default),
                essence_rituals::area::RangeCheck::Success,
                "default `{}` of `{}` exceeds its limits",
                range.key,
                info.id
            );
        }
    }
}

#[test]
fn test_fresh_instance_per_create() {
    let registry = RitualRegistry::with_default_rituals();
    let first = registry.create("magnetism").unwrap();
    let second = registry.create("magnetism").unwrap();
    assert_eq!(first.save_extra(), second.save_extra());
    assert_eq!(first.info(), registry.info("magnetism").unwrap());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_reload_from_json() {
    let mut registry = RitualRegistry::with_default_rituals();
    let config = RitualConfig::from_json(
        r#"{
            "rituals": {
                "water": {
                    "activation_cost": 100,
                    "refresh_time": 5,
                    "ranges": {
                        "water_range": { "max_volume": 25, "max_horizontal": 5, "max_vertical": 5 }
                    }
                },
                "void": { "enabled": false }
            }
        }"#,
    )
    .unwrap();

    registry.reload(config);

    let water = registry.info("water").unwrap();
    assert_eq!(water.activation_cost, 100);
    assert_eq!(water.refresh_cost, 25);
    assert_eq!(water.refresh_time, 5);
    assert_eq!(water.limits("water_range"), Some(RangeLimits::new(25, 5, 5)));
    assert!(!registry.info("void").unwrap().enabled);

    let fresh = registry.create("water").unwrap();
    assert_eq!(fresh.info().activation_cost, 100);

    registry.reload(RitualConfig::new());
    assert_eq!(registry.info("water").unwrap().activation_cost, 500);
    assert!(registry.info("void").unwrap().enabled);
}

#[test]
fn test_invalid_config_is_an_error() {
    let err = RitualConfig::from_json(r#"{ "rituals": { "water": { "refresh_time": -1 } } }"#).unwrap_err();
    assert!(err.to_string().starts_with("invalid ritual configuration"));
}

// =============================================================================
// Imperfect Rituals
// =============================================================================

/// An exact block match wins over a tag that also contains the block.
#[test]
fn test_imperfect_exact_beats_tag() {
    let mut registry = RitualRegistry::with_default_rituals();
    let world = MemoryWorld::new();
    let ice = BlockState::of(BlockId::ICE);

    assert_eq!(registry.imperfect().lookup(&world, &ice).map(|r| r.id()), Some("frost"));

    registry.reload(RitualConfig::new().with_imperfect("day", ImperfectStats::block(BlockId::ICE)));
    assert!(!registry.imperfect().is_cached());
    assert_eq!(registry.imperfect().lookup(&world, &ice).map(|r| r.id()), Some("day"));

    let packed = BlockState::of(BlockId::from_static("packed_ice"));
    assert_eq!(registry.imperfect().lookup(&world, &packed).map(|r| r.id()), Some("frost"));
    assert!(registry.imperfect().is_cached());
}

#[test]
fn test_imperfect_disabled_and_retagged() {
    let mut registry = RitualRegistry::with_default_rituals();
    let world = MemoryWorld::new();
    let gold = BlockState::of(BlockId::from_static("gold_block"));

    registry.reload(RitualConfig::new().with_imperfect("day", ImperfectStats::block(BlockId::from_static("gold_block")).with_enabled(false)));
    assert!(registry.imperfect().lookup(&world, &gold).is_none());

    registry.reload(RitualConfig::new().with_imperfect("zombie", ImperfectStats::tag(TagId::LOGS)));
    let log = BlockState::of(BlockId::from_static("oak_log"));
    assert_eq!(registry.imperfect().lookup(&world, &log).map(|r| r.id()), Some("zombie"));
}

#[test]
fn test_imperfect_activation() {
    let registry = RitualRegistry::with_default_rituals();
    let mut world = MemoryWorld::new();
    let mut essence = MemoryEssence::new().with_account(OWNER, 5100);
    let mut rng = RitualRng::new(2);
    let anchor = BlockPos::new(0, 70, 0);

    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        let result = registry.imperfect().activate(&mut env, anchor, OWNER);
        assert_eq!(result.reason, Some(FailureReason::MissingCatalystOrTarget));
    }

    world.set_block(anchor.above(), BlockId::from_static("gold_block"));
    {
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        assert!(registry.imperfect().activate(&mut env, anchor, OWNER).is_success());
    }
    assert_eq!(world.time_of_day(), 1000);
    assert_eq!(world.lightning_strikes(), &[anchor.above()]);
    assert_eq!(essence.balance(OWNER), Some(100));
    assert_eq!(world.block_state(anchor.above()).block, BlockId::from_static("gold_block"));

    let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
    let result = registry.imperfect().activate(&mut env, anchor, OWNER);
    assert_eq!(result.reason, Some(FailureReason::InsufficientResource));
    assert_eq!(result.context_value, 5000);
}
