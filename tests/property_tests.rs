//! Property tests for essence accounting and area geometry.

use essence_rituals::admin;
use essence_rituals::area::{AreaDescriptor, RangeCheck, RangeLimits};
use essence_rituals::core::{BlockId, BlockPos, OwnerId, RitualRng};
use essence_rituals::ritual::{MaxOperations, RitualAnchor, RitualContext, RitualEnv, RitualRegistry};
use essence_rituals::world::memory::{MemoryEssence, MemoryWorld};
use essence_rituals::world::EssenceNetwork;
use proptest::prelude::*;

const OWNER: OwnerId = OwnerId::from_u128(1);

fn offset() -> impl Strategy<Value = BlockPos> {
    (-8i32..=8, -8i32..=8, -8i32..=8).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

/// A coordinate anywhere in `i32`, biased toward zero and the edges.
fn coord() -> impl Strategy<Value = i32> {
    prop_oneof![-8i32..=8, any::<i32>(), Just(i32::MIN), Just(i32::MAX)]
}

fn any_offset() -> impl Strategy<Value = BlockPos> {
    (coord(), coord(), coord()).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

proptest! {
    /// The operations a balance allows never cost more than the balance.
    #[test]
    fn prop_max_operations_within_balance(balance in 0i64..1_000_000, cost in 1i64..10_000) {
        match MaxOperations::for_balance(balance, cost) {
            MaxOperations::Limited(n) => {
                let n = i64::try_from(n).unwrap();
                prop_assert!(n * cost <= balance);
                prop_assert!((n + 1) * cost > balance);
            }
            MaxOperations::Unlimited => prop_assert!(false, "positive cost is never unlimited"),
        }
    }

    /// Free operations are unlimited at any balance.
    #[test]
    fn prop_free_operations_unlimited(balance in -1000i64..1000, cost in -10i64..=0) {
        prop_assert_eq!(MaxOperations::for_balance(balance, cost), MaxOperations::Unlimited);
    }

    /// However many budgets a tick takes, it never spends more than the
    /// balance it started with.
    #[test]
    fn prop_spend_never_exceeds_balance(
        balance in 0i64..500,
        costs in prop::collection::vec(0i64..60, 1..5),
        attempts in prop::collection::vec(0u32..20, 1..5),
    ) {
        let mut world = MemoryWorld::new();
        let mut essence = MemoryEssence::new().with_account(OWNER, balance);
        let mut rng = RitualRng::new(0);
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
        let anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(OWNER);

        let mut total = 0;
        {
            let mut ctx = RitualContext::create(&anchor, &mut env, 0).unwrap();
            for (cost, tries) in costs.iter().zip(attempts.iter()) {
                let mut budget = ctx.budget(*cost);
                for _ in 0..*tries {
                    budget.attempt(|| true);
                }
                total += ctx.spend(budget);
            }
            prop_assert_eq!(ctx.spent(), total);
        }
        prop_assert!(total <= balance);
        prop_assert_eq!(env.essence.balance(OWNER), Some(balance - total));
    }

    /// A water tick places exactly what its balance pays for.
    #[test]
    fn prop_water_tick_is_paid_for(balance in 0i64..300) {
        let registry = RitualRegistry::with_default_rituals();
        let mut world = MemoryWorld::new();
        let mut essence = MemoryEssence::new().with_account(OWNER, balance);
        let mut rng = RitualRng::new(0);
        let mut anchor = RitualAnchor::new(BlockPos::ZERO);
        {
            let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
            prop_assert!(admin::force_activate(&mut anchor, &registry, &mut env, "water", Some(OWNER)).is_success());
            anchor.set_range("water_range", BlockPos::new(-1, 1, -1), BlockPos::new(1, 1, 1)).unwrap();
            anchor.tick(&mut env);
        }

        let area = AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 1, 3).bounding_box(BlockPos::ZERO);
        let placed = i64::try_from(world.count_blocks(&area, &BlockId::WATER)).unwrap();
        let expected = if balance >= 25 { (balance / 25).min(9) } else { 0 };
        prop_assert_eq!(placed, expected);
        prop_assert_eq!(essence.balance(OWNER), Some(balance - placed * 25));
    }

    /// Area positions are restartable and all lie inside the bounding box.
    #[test]
    fn prop_positions_restartable(first in offset(), second in offset(), hemisphere in any::<bool>()) {
        let shape = if hemisphere {
            AreaDescriptor::hemisphere(BlockPos::ZERO, 1)
        } else {
            AreaDescriptor::rectangle(BlockPos::ZERO, 1, 1, 1)
        };
        let area = shape.from_offsets(first, second);
        let anchor = BlockPos::new(100, 64, -100);

        let once: Vec<BlockPos> = area.contained_positions(anchor).collect();
        let twice: Vec<BlockPos> = area.contained_positions(anchor).collect();
        prop_assert_eq!(&once, &twice);

        let bb = area.bounding_box(anchor);
        prop_assert!(once.iter().all(|p| bb.contains(*p)));
        prop_assert!(u64::try_from(once.len()).unwrap() <= area.volume());
    }

    /// Oversized requests are rejected for volume before bounds.
    #[test]
    fn prop_volume_checked_first(
        first in any_offset(),
        second in any_offset(),
        max_volume in 1u64..200,
        hemisphere in any::<bool>(),
    ) {
        let limits = RangeLimits::new(max_volume, 2, 2);
        let shape = if hemisphere {
            AreaDescriptor::hemisphere(BlockPos::ZERO, 1)
        } else {
            AreaDescriptor::rectangle(BlockPos::ZERO, 1, 1, 1)
        };
        let area = shape.from_offsets(first, second);
        let check = limits.check(&area);
        if area.volume() > max_volume {
            prop_assert_eq!(check, RangeCheck::VolumeTooLarge);
        } else if !area.fits_radii(2, 2) {
            prop_assert_eq!(check, RangeCheck::OutOfBounds);
        } else {
            prop_assert_eq!(check, RangeCheck::Success);
        }
    }

    /// An accepted rectangle never reaches past the radii, however far the
    /// selected corners were.
    #[test]
    fn prop_accepted_rectangle_within_radii(first in any_offset(), second in any_offset()) {
        let limits = RangeLimits::new(1000, 4, 3);
        let area = AreaDescriptor::rectangle(BlockPos::ZERO, 1, 1, 1).from_offsets(first, second);
        if limits.check(&area).is_success() {
            for corner in [first, second] {
                prop_assert!(corner.x.unsigned_abs() <= 4 && corner.z.unsigned_abs() <= 4 && corner.y.unsigned_abs() <= 3);
            }
            prop_assert!(area.volume() <= 1000);
        }
    }
}
