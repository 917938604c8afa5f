//! Per-tick execution context and essence budgets.
//!
//! Every refresh follows the same shape:
//!
//! 1. `RitualContext::create` snapshots the owner's balance. It returns
//!    `None` (skip the tick) for preview views, unowned anchors, missing
//!    accounts or a balance below the ritual's minimum.
//! 2. `budget(cost)` reserves as many operations as the snapshot allows.
//! 3. Each effect runs through `OperationBudget::attempt`, which refuses
//!    once the budget is used up and only counts effects that happened.
//! 4. `spend(budget)` deducts `performed * cost`.
//!
//! `spend` is the only way to deduct essence during a tick, and a budget
//! can only be created from what remains of the snapshot, so a tick can
//! never spend more than the balance it started with.
//!
//! ## Example
//!
//! ```
//! use essence_rituals::core::{BlockId, BlockPos, OwnerId, RitualRng};
//! use essence_rituals::ritual::{RitualAnchor, RitualContext, RitualEnv};
//! use essence_rituals::world::memory::{MemoryEssence, MemoryWorld};
//! use essence_rituals::world::{BlockState, EssenceNetwork, World};
//!
//! let owner = OwnerId::from_u128(7);
//! let mut world = MemoryWorld::new();
//! let mut essence = MemoryEssence::new().with_account(owner, 60);
//! let mut rng = RitualRng::new(0);
//! let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
//! let anchor = RitualAnchor::new(BlockPos::ZERO).with_owner(owner);
//!
//! let mut ctx = RitualContext::create(&anchor, &mut env, 0).unwrap();
//! let mut budget = ctx.budget(25);
//! for x in 0..9 {
//!     let pos = BlockPos::new(x, 1, 0);
//!     budget.attempt(|| ctx.world.place_block(pos, BlockState::of(BlockId::WATER), Some(owner)));
//! }
//! assert_eq!(budget.performed(), 2);
//! assert_eq!(ctx.spend(budget), 50);
//! assert_eq!(essence.balance(owner), Some(10));
//! ```

use crate::area::AreaDescriptor;
use crate::core::{BlockBox, BlockPos, Direction, EntityId, OwnerId, RitualRng};
use crate::world::{
    Entity, EntityFilter, EssenceNetwork, StructureSynthesizer, SynthesisRequest, World,
};

use super::anchor::RitualAnchor;
use super::template::RitualInfo;

/// Host services handed to a ritual for one call.
pub struct RitualEnv<'a> {
    pub world: &'a mut dyn World,
    pub essence: &'a mut dyn EssenceNetwork,
    pub rng: &'a mut RitualRng,
    pub synthesizer: Option<&'a mut dyn StructureSynthesizer>,
    /// False for preview views that must not mutate anything.
    pub authoritative: bool,
}

impl<'a> RitualEnv<'a> {
    /// Create an authoritative environment without a synthesizer.
    pub fn new(
        world: &'a mut dyn World,
        essence: &'a mut dyn EssenceNetwork,
        rng: &'a mut RitualRng,
    ) -> Self {
        Self {
            world,
            essence,
            rng,
            synthesizer: None,
            authoritative: true,
        }
    }

    /// Attach a structure synthesizer (builder pattern).
    #[must_use]
    pub fn with_synthesizer(mut self, synthesizer: &'a mut dyn StructureSynthesizer) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Mark as a preview view (builder pattern).
    #[must_use]
    pub fn preview(mut self) -> Self {
        self.authoritative = false;
        self
    }
}

impl std::fmt::Debug for RitualEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RitualEnv")
            .field("authoritative", &self.authoritative)
            .field("synthesizer", &self.synthesizer.is_some())
            .finish_non_exhaustive()
    }
}

/// How many operations a balance allows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaxOperations {
    /// The operation is free.
    Unlimited,
    Limited(u64),
}

impl MaxOperations {
    /// Operations allowed for `available` essence at `cost` each.
    #[must_use]
    pub fn for_balance(available: i64, cost: i64) -> Self {
        if cost <= 0 {
            MaxOperations::Unlimited
        } else {
            MaxOperations::Limited(u64::try_from(available.max(0) / cost).unwrap_or(0))
        }
    }

    /// Does this allow at least one more operation after `performed`?
    #[must_use]
    pub fn allows(self, performed: u64) -> bool {
        match self {
            MaxOperations::Unlimited => true,
            MaxOperations::Limited(max) => performed < max,
        }
    }
}

/// Reserved capacity for one kind of operation.
///
/// Created by [`RitualContext::budget`] and settled by
/// [`RitualContext::spend`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a budget is settled with RitualContext::spend"]
pub struct OperationBudget {
    cost: i64,
    capacity: MaxOperations,
    performed: u64,
}

impl OperationBudget {
    /// Run `effect` if capacity remains. Returns whether it happened.
    ///
    /// Only effects that report success consume capacity.
    pub fn attempt(&mut self, effect: impl FnOnce() -> bool) -> bool {
        if !self.capacity.allows(self.performed) {
            return false;
        }
        let done = effect();
        if done {
            self.performed += 1;
        }
        done
    }

    /// Is there no capacity left?
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        !self.capacity.allows(self.performed)
    }

    /// Operations that happened so far.
    #[must_use]
    pub fn performed(&self) -> u64 {
        self.performed
    }

    /// Cost per operation.
    #[must_use]
    pub fn cost(&self) -> i64 {
        self.cost
    }

    /// Total capacity.
    #[must_use]
    pub fn capacity(&self) -> MaxOperations {
        self.capacity
    }

    fn reserved(&self) -> i64 {
        match self.capacity {
            MaxOperations::Unlimited => 0,
            MaxOperations::Limited(max) => i64::try_from(max).unwrap_or(i64::MAX).saturating_mul(self.cost),
        }
    }

    fn charge(&self) -> i64 {
        i64::try_from(self.performed)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.cost.max(0))
    }
}

/// Context of one ritual tick.
pub struct RitualContext<'e> {
    pub world: &'e mut dyn World,
    pub rng: &'e mut RitualRng,
    essence: &'e mut dyn EssenceNetwork,
    synthesizer: Option<&'e mut dyn StructureSynthesizer>,
    owner: OwnerId,
    anchor_pos: BlockPos,
    facing: Direction,
    balance: i64,
    spent: i64,
    reserved: i64,
}

impl<'e> RitualContext<'e> {
    /// Snapshot the owner's balance for one tick.
    pub fn create(anchor: &RitualAnchor, env: &'e mut RitualEnv<'_>, min_essence: i64) -> Option<Self> {
        if !env.authoritative {
            return None;
        }
        let owner = anchor.owner()?;
        let balance = env.essence.balance(owner)?;
        if balance < min_essence {
            log::debug!("{} skipped: balance {} below {}", anchor.pos(), balance, min_essence);
            return None;
        }

        let synthesizer: Option<&'e mut dyn StructureSynthesizer> = match env.synthesizer.as_deref_mut() {
            Some(s) => Some(s),
            None => None,
        };

        Some(Self {
            world: &mut *env.world,
            rng: &mut *env.rng,
            essence: &mut *env.essence,
            synthesizer,
            owner,
            anchor_pos: anchor.pos(),
            facing: anchor.facing(),
            balance,
            spent: 0,
            reserved: 0,
        })
    }

    /// Owner paying for this tick.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Position of the anchor.
    #[must_use]
    pub fn anchor_pos(&self) -> BlockPos {
        self.anchor_pos
    }

    /// Facing of the anchor.
    #[must_use]
    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Balance captured at creation.
    #[must_use]
    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Balance not yet spent or reserved.
    #[must_use]
    pub fn available(&self) -> i64 {
        self.balance - self.spent - self.reserved
    }

    /// Essence spent so far this tick.
    #[must_use]
    pub fn spent(&self) -> i64 {
        self.spent
    }

    /// Operations the remaining balance allows at `cost` each.
    #[must_use]
    pub fn max_operations(&self, cost: i64) -> MaxOperations {
        MaxOperations::for_balance(self.available(), cost)
    }

    /// Reserve capacity for operations at `cost` each.
    pub fn budget(&mut self, cost: i64) -> OperationBudget {
        let budget = OperationBudget {
            cost,
            capacity: self.max_operations(cost),
            performed: 0,
        };
        self.reserved += budget.reserved();
        budget
    }

    /// Settle a budget: release its reservation and deduct what was performed.
    pub fn spend(&mut self, budget: OperationBudget) -> i64 {
        self.reserved -= budget.reserved();
        let amount = budget.charge();
        if amount == 0 {
            return 0;
        }
        let cap = self.available().max(0);
        let charged = self.essence.spend(self.owner, amount, cap);
        self.spent += charged;
        charged
    }

    /// Add essence to the owner without exceeding `cap`.
    pub fn credit(&mut self, amount: i64, cap: i64) -> i64 {
        self.essence.credit(self.owner, amount, cap)
    }

    /// Effective area of a range: the anchor's override, else the default.
    #[must_use]
    pub fn effective_range(&self, anchor: &RitualAnchor, info: &RitualInfo, key: &str) -> Option<AreaDescriptor> {
        anchor
            .range_override(key)
            .or_else(|| info.default_range(key))
            .cloned()
    }

    /// World box of a range.
    #[must_use]
    pub fn range_box(&self, anchor: &RitualAnchor, info: &RitualInfo, key: &str) -> Option<BlockBox> {
        self.effective_range(anchor, info, key)
            .map(|area| area.bounding_box(self.anchor_pos))
    }

    /// Positions of a range in iteration order.
    #[must_use]
    pub fn positions_in_range(&self, anchor: &RitualAnchor, info: &RitualInfo, key: &str) -> Vec<BlockPos> {
        self.effective_range(anchor, info, key)
            .map(|area| area.contained_positions(self.anchor_pos).collect())
            .unwrap_or_default()
    }

    /// Entities inside a range that pass the filter, in id order.
    #[must_use]
    pub fn entities_in_range(
        &self,
        anchor: &RitualAnchor,
        info: &RitualInfo,
        key: &str,
        filter: EntityFilter,
    ) -> Vec<EntityId> {
        self.entities_in_range_where(anchor, info, key, filter, |_| true)
    }

    /// Entities inside a range that pass the filter and `predicate`.
    #[must_use]
    pub fn entities_in_range_where(
        &self,
        anchor: &RitualAnchor,
        info: &RitualInfo,
        key: &str,
        filter: EntityFilter,
        predicate: impl Fn(&Entity) -> bool,
    ) -> Vec<EntityId> {
        let Some(area) = self.effective_range(anchor, info, key) else {
            return Vec::new();
        };
        let bounds = area.bounding_box(self.anchor_pos);
        self.world
            .entities_in(&bounds, filter)
            .into_iter()
            .filter(|id| {
                self.world.entity(*id).is_some_and(|e| {
                    area.is_within_area(e.pos.block_pos().relative_to(self.anchor_pos)) && predicate(e)
                })
            })
            .collect()
    }

    /// Delegate structure generation to the host.
    pub fn synthesize(&mut self, request: &SynthesisRequest) -> Option<BlockBox> {
        let synthesizer = self.synthesizer.as_deref_mut()?;
        synthesizer.generate(&mut *self.world, request, &mut *self.rng)
    }
}

impl std::fmt::Debug for RitualContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RitualContext")
            .field("owner", &self.owner)
            .field("anchor_pos", &self.anchor_pos)
            .field("balance", &self.balance)
            .field("spent", &self.spent)
            .field("reserved", &self.reserved)
            .finish_non_exhaustive()
    }
}
