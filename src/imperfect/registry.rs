//! Imperfect ritual registry with a lazily built lookup cache.

use std::cell::OnceCell;

use rustc_hash::FxHashMap;

use super::{CatalystRequirement, ImperfectContext, ImperfectRitual};
use crate::core::{BlockId, BlockPos, ImperfectStats, OwnerId, RitualConfig};
use crate::ritual::{FailureReason, RitualEnv, RitualResult};
use crate::world::{BlockState, World};

/// Lookup tables in priority order. Values index into the ritual list.
#[derive(Debug, Default)]
struct LookupCache {
    exact: FxHashMap<BlockId, usize>,
    tagged: Vec<(CatalystRequirement, usize)>,
    predicates: Vec<(CatalystRequirement, usize)>,
}

impl LookupCache {
    fn scan(list: &[(CatalystRequirement, usize)], world: &dyn World, catalyst: &BlockState) -> Option<usize> {
        list.iter()
            .find(|(requirement, _)| requirement.matches(world, catalyst))
            .map(|(_, index)| *index)
    }
}

/// Registry of imperfect rituals.
///
/// ## Example
///
/// ```
/// use essence_rituals::core::{BlockId, ImperfectStats, RitualConfig};
/// use essence_rituals::imperfect::ImperfectRegistry;
/// use essence_rituals::world::memory::MemoryWorld;
/// use essence_rituals::world::BlockState;
///
/// let mut registry = ImperfectRegistry::with_default_rituals();
/// let world = MemoryWorld::new();
/// let gold = BlockState::of(BlockId::from_static("gold_block"));
/// assert_eq!(registry.lookup(&world, &gold).unwrap().id(), "day");
///
/// registry.apply_config(&RitualConfig::new().with_imperfect("day", ImperfectStats::default().with_enabled(false)));
/// assert!(registry.lookup(&world, &gold).is_none());
/// ```
#[derive(Debug, Default)]
pub struct ImperfectRegistry {
    rituals: Vec<Box<dyn ImperfectRitual>>,
    stats: FxHashMap<String, ImperfectStats>,
    cache: OnceCell<LookupCache>,
}

impl ImperfectRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in imperfect rituals.
    #[must_use]
    pub fn with_default_rituals() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(super::DayRitual));
        registry.register(Box::new(super::NightRitual));
        registry.register(Box::new(super::RainRitual));
        registry.register(Box::new(super::ResistanceRitual));
        registry.register(Box::new(super::ZombieRitual));
        registry.register(Box::new(super::FrostRitual));
        registry
    }

    /// Register a ritual.
    ///
    /// Panics if a ritual with the same id already exists.
    pub fn register(&mut self, ritual: Box<dyn ImperfectRitual>) {
        if self.get(ritual.id()).is_some() {
            panic!("Imperfect ritual `{}` already registered", ritual.id());
        }
        self.rituals.push(ritual);
        self.invalidate();
    }

    /// Replace the effective stats and drop the lookup cache.
    pub fn apply_config(&mut self, config: &RitualConfig) {
        self.stats = config.imperfect.clone();
        self.invalidate();
    }

    /// Drop the lookup cache; it is rebuilt on the next lookup.
    pub fn invalidate(&mut self) {
        self.cache = OnceCell::new();
    }

    /// Has the lookup cache been built?
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.get().is_some()
    }

    /// A ritual by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn ImperfectRitual> {
        self.rituals.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rituals.iter().map(|r| r.id())
    }

    /// Number of registered rituals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rituals.len()
    }

    /// Is the registry empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rituals.is_empty()
    }

    /// Is the ritual enabled by configuration?
    #[must_use]
    pub fn is_enabled(&self, id: &str) -> bool {
        self.stats.get(id).map_or(true, |s| s.enabled)
    }

    /// Effective catalyst requirement of a ritual.
    #[must_use]
    pub fn requirement(&self, ritual: &dyn ImperfectRitual) -> CatalystRequirement {
        match self.stats.get(ritual.id()) {
            Some(ImperfectStats { block: Some(block), .. }) => CatalystRequirement::Block(block.clone()),
            Some(ImperfectStats { tag: Some(tag), .. }) => CatalystRequirement::Tag(tag.clone()),
            _ => ritual.requirement(),
        }
    }

    /// Effective activation cost of a ritual.
    #[must_use]
    pub fn activation_cost(&self, ritual: &dyn ImperfectRitual) -> i64 {
        self.stats
            .get(ritual.id())
            .and_then(|s| s.activation_cost)
            .unwrap_or_else(|| ritual.activation_cost())
    }

    fn consumes(&self, ritual: &dyn ImperfectRitual) -> bool {
        self.stats.get(ritual.id()).is_some_and(|s| s.consume)
    }

    fn cache(&self) -> &LookupCache {
        self.cache.get_or_init(|| {
            let mut cache = LookupCache::default();
            for (index, ritual) in self.rituals.iter().enumerate() {
                if !self.is_enabled(ritual.id()) {
                    continue;
                }
                match self.requirement(ritual.as_ref()) {
                    CatalystRequirement::Block(block) => {
                        cache.exact.entry(block).or_insert(index);
                    }
                    tag @ CatalystRequirement::Tag(_) => cache.tagged.push((tag, index)),
                    test @ CatalystRequirement::Predicate(_) => cache.predicates.push((test, index)),
                }
            }
            log::debug!(
                "imperfect lookup built: {} exact, {} tagged, {} predicates",
                cache.exact.len(),
                cache.tagged.len(),
                cache.predicates.len()
            );
            cache
        })
    }

    /// The ritual a catalyst block selects.
    #[must_use]
    pub fn lookup(&self, world: &dyn World, catalyst: &BlockState) -> Option<&dyn ImperfectRitual> {
        let cache = self.cache();
        let index = cache
            .exact
            .get(&catalyst.block)
            .copied()
            .or_else(|| LookupCache::scan(&cache.tagged, world, catalyst))
            .or_else(|| LookupCache::scan(&cache.predicates, world, catalyst))?;
        self.rituals.get(index).map(|r| r.as_ref())
    }

    /// Activate the imperfect anchor at `anchor_pos`.
    ///
    /// The cost is only deducted when the effect ran.
    pub fn activate(&self, env: &mut RitualEnv<'_>, anchor_pos: BlockPos, activator: OwnerId) -> RitualResult {
        if !env.authoritative {
            return RitualResult::failure(FailureReason::ActivationFailedGeneric);
        }

        let catalyst_pos = anchor_pos.above();
        let catalyst = env.world.block_state(catalyst_pos);
        let Some(ritual) = self.lookup(&*env.world, &catalyst) else {
            return RitualResult::failure(FailureReason::MissingCatalystOrTarget);
        };
        let Some(balance) = env.essence.balance(activator) else {
            return RitualResult::failure(FailureReason::NoOwnerOrAccount);
        };
        let cost = self.activation_cost(ritual);
        if balance < cost {
            return RitualResult::failure_with(FailureReason::InsufficientResource, cost);
        }

        let mut ctx = ImperfectContext {
            world: &mut *env.world,
            rng: &mut *env.rng,
            anchor_pos,
            catalyst_pos,
            activator,
        };
        if !ritual.on_activate(&mut ctx) {
            return RitualResult::failure(FailureReason::ActivationCancelled);
        }

        env.essence.spend(activator, cost, cost);
        if ritual.lightning() {
            env.world.strike_lightning(catalyst_pos);
        }
        if self.consumes(ritual) && !env.world.replace_block(catalyst_pos, BlockState::AIR, Some(activator)) {
            log::warn!("catalyst at {} could not be consumed", catalyst_pos);
        }
        log::info!("imperfect ritual `{}` activated at {}", ritual.id(), anchor_pos);
        RitualResult::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RitualRng, TagId};
    use crate::world::memory::{MemoryEssence, MemoryWorld};
    use crate::world::EssenceNetwork;

    #[derive(Debug)]
    struct Marker(&'static str, CatalystRequirement);

    impl ImperfectRitual for Marker {
        fn id(&self) -> &str {
            self.0
        }

        fn requirement(&self) -> CatalystRequirement {
            self.1.clone()
        }

        fn activation_cost(&self) -> i64 {
            10
        }

        fn on_activate(&self, _ctx: &mut ImperfectContext<'_>) -> bool {
            true
        }
    }

    /// Like `Marker`, without the lightning bolt.
    #[derive(Debug)]
    struct Quiet(&'static str, CatalystRequirement);

    impl ImperfectRitual for Quiet {
        fn id(&self) -> &str {
            self.0
        }

        fn requirement(&self) -> CatalystRequirement {
            self.1.clone()
        }

        fn activation_cost(&self) -> i64 {
            10
        }

        fn lightning(&self) -> bool {
            false
        }

        fn on_activate(&self, _ctx: &mut ImperfectContext<'_>) -> bool {
            true
        }
    }

    #[test]
    fn test_lightning_follows_ritual_flag() {
        let mut registry = ImperfectRegistry::new();
        registry.register(Box::new(Marker("loud", CatalystRequirement::Block(BlockId::STONE))));
        registry.register(Box::new(Quiet("quiet", CatalystRequirement::Block(BlockId::ICE))));
        let owner = OwnerId::from_u128(3);
        let mut world = MemoryWorld::new();
        let mut essence = MemoryEssence::new().with_account(owner, 100);
        let mut rng = RitualRng::new(0);

        world.set_block(BlockPos::new(0, 1, 0), BlockId::STONE);
        world.set_block(BlockPos::new(5, 1, 0), BlockId::ICE);
        {
            let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);
            assert!(registry.activate(&mut env, BlockPos::ZERO, owner).is_success());
            assert!(registry.activate(&mut env, BlockPos::new(5, 0, 0), owner).is_success());
        }
        assert_eq!(world.lightning_strikes(), &[BlockPos::new(0, 1, 0)]);
        assert_eq!(essence.balance(owner), Some(80));
    }

    #[test]
    fn test_exact_beats_tag() {
        let mut registry = ImperfectRegistry::new();
        registry.register(Box::new(Marker("by_tag", CatalystRequirement::Tag(TagId::ICE))));
        registry.register(Box::new(Marker("by_block", CatalystRequirement::Block(BlockId::ICE))));

        let world = MemoryWorld::new();
        let found = registry.lookup(&world, &BlockState::of(BlockId::ICE)).unwrap();
        assert_eq!(found.id(), "by_block");

        let packed = BlockState::of(BlockId::from_static("packed_ice"));
        assert_eq!(registry.lookup(&world, &packed).unwrap().id(), "by_tag");
    }

    #[test]
    fn test_tag_beats_predicate() {
        let mut registry = ImperfectRegistry::new();
        registry.register(Box::new(Marker("anything", CatalystRequirement::Predicate(|s| !s.is_air()))));
        registry.register(Box::new(Marker("ice", CatalystRequirement::Tag(TagId::ICE))));

        let world = MemoryWorld::new();
        assert_eq!(registry.lookup(&world, &BlockState::of(BlockId::ICE)).unwrap().id(), "ice");
        assert_eq!(
            registry.lookup(&world, &BlockState::of(BlockId::STONE)).unwrap().id(),
            "anything"
        );
        assert!(registry.lookup(&world, &BlockState::AIR).is_none());
    }

    #[test]
    fn test_cache_is_lazy_and_invalidated() {
        let mut registry = ImperfectRegistry::with_default_rituals();
        assert!(!registry.is_cached());

        let world = MemoryWorld::new();
        let diamond = BlockState::of(BlockId::from_static("diamond_block"));
        assert!(registry.lookup(&world, &diamond).is_none());
        assert!(registry.is_cached());

        registry.apply_config(
            &RitualConfig::new().with_imperfect("night", ImperfectStats::block(BlockId::from_static("diamond_block"))),
        );
        assert!(!registry.is_cached());
        assert_eq!(registry.lookup(&world, &diamond).unwrap().id(), "night");
    }

    #[test]
    fn test_activate_missing_catalyst() {
        let registry = ImperfectRegistry::with_default_rituals();
        let owner = OwnerId::from_u128(3);
        let mut world = MemoryWorld::new();
        let mut essence = MemoryEssence::new().with_account(owner, 10_000);
        let mut rng = RitualRng::new(0);
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);

        let result = registry.activate(&mut env, BlockPos::ZERO, owner);
        assert_eq!(result.reason, Some(FailureReason::MissingCatalystOrTarget));
    }

    #[test]
    fn test_activate_consumes_when_configured() {
        let mut registry = ImperfectRegistry::with_default_rituals();
        registry.apply_config(
            &RitualConfig::new().with_imperfect("night", ImperfectStats::default().consuming().with_activation_cost(50)),
        );
        let owner = OwnerId::from_u128(3);
        let mut world = MemoryWorld::new();
        world.set_block(BlockPos::new(0, 1, 0), BlockId::from_static("lapis_block"));
        let mut essence = MemoryEssence::new().with_account(owner, 60);
        let mut rng = RitualRng::new(0);
        let mut env = RitualEnv::new(&mut world, &mut essence, &mut rng);

        let result = registry.activate(&mut env, BlockPos::ZERO, owner);
        assert!(result.is_success());
        drop(env);
        assert_eq!(world.time_of_day(), 13000);
        assert!(world.block_state(BlockPos::new(0, 1, 0)).is_air());
        assert_eq!(essence.balance(owner), Some(10));
    }
}
