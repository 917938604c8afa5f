//! Ritual registry: factories, effective templates, structure matching.
//!
//! Rituals are registered once at startup as factories. Every activation
//! gets a fresh instance with the current configuration applied. The
//! registry also owns the imperfect ritual registry so that a configuration
//! reload invalidates both together.

use rustc_hash::FxHashMap;

use super::component::check_structure;
use super::template::{Ritual, RitualInfo};
use crate::core::{BlockPos, Direction, RitualConfig};
use crate::imperfect::ImperfectRegistry;
use crate::world::World;

/// Creates a fresh ritual instance with template defaults.
pub type RitualFactory = fn() -> Box<dyn Ritual>;

#[derive(Clone, Debug)]
struct Entry {
    factory: RitualFactory,
    /// Template with the current configuration applied.
    info: RitualInfo,
}

/// Registry of ritual factories.
///
/// ## Example
///
/// ```
/// use essence_rituals::core::{RitualConfig, RitualOverrides};
/// use essence_rituals::ritual::RitualRegistry;
///
/// let mut registry = RitualRegistry::with_default_rituals();
/// assert_eq!(registry.info("water").unwrap().refresh_cost, 25);
///
/// registry.reload(RitualConfig::new().with_ritual("water", RitualOverrides::new().with_refresh_cost(40)));
/// assert_eq!(registry.create("water").unwrap().info().refresh_cost, 40);
/// ```
#[derive(Debug, Default)]
pub struct RitualRegistry {
    entries: FxHashMap<String, Entry>,
    order: Vec<String>,
    config: RitualConfig,
    imperfect: ImperfectRegistry,
}

impl RitualRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in ritual and imperfect ritual.
    #[must_use]
    pub fn with_default_rituals() -> Self {
        let mut registry = Self::new();
        crate::rituals::register_all(&mut registry);
        registry.imperfect = ImperfectRegistry::with_default_rituals();
        registry
    }

    /// Register a ritual factory.
    ///
    /// Panics if a ritual with the same id already exists.
    pub fn register(&mut self, factory: RitualFactory) {
        let mut info = factory().info().clone();
        if self.entries.contains_key(&info.id) {
            panic!("Ritual `{}` already registered", info.id);
        }
        if let Some(overrides) = self.config.ritual(&info.id) {
            info.apply_overrides(overrides);
        }
        self.order.push(info.id.clone());
        self.entries.insert(info.id.clone(), Entry { factory, info });
    }

    /// Create a fresh instance with the current configuration applied.
    #[must_use]
    pub fn create(&self, id: &str) -> Option<Box<dyn Ritual>> {
        let entry = self.entries.get(id)?;
        let mut ritual = (entry.factory)();
        if let Some(overrides) = self.config.ritual(id) {
            ritual.info_mut().apply_overrides(overrides);
        }
        Some(ritual)
    }

    /// Effective template of a ritual.
    #[must_use]
    pub fn info(&self, id: &str) -> Option<&RitualInfo> {
        self.entries.get(id).map(|e| &e.info)
    }

    /// Is the ritual registered?
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Effective templates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RitualInfo> {
        self.order.iter().filter_map(|id| self.info(id))
    }

    /// Number of registered rituals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the registry empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &RitualConfig {
        &self.config
    }

    /// Replace the configuration.
    ///
    /// Templates are rebuilt from their factories and the imperfect lookup
    /// cache is invalidated. Running instances keep the values they were
    /// created with.
    pub fn reload(&mut self, config: RitualConfig) {
        for (id, entry) in &mut self.entries {
            let mut info = (entry.factory)().info().clone();
            if let Some(overrides) = config.ritual(id) {
                info.apply_overrides(overrides);
            }
            entry.info = info;
        }
        self.imperfect.apply_config(&config);
        self.config = config;
        log::info!("ritual configuration reloaded ({} rituals)", self.entries.len());
    }

    /// Imperfect rituals.
    #[must_use]
    pub fn imperfect(&self) -> &ImperfectRegistry {
        &self.imperfect
    }

    /// Mutable imperfect rituals, for registering additional ones.
    pub fn imperfect_mut(&mut self) -> &mut ImperfectRegistry {
        &mut self.imperfect
    }

    /// The enabled ritual whose structure is complete around `anchor`.
    ///
    /// When several match, the one with the most components wins; ties go
    /// to the earlier registration.
    #[must_use]
    pub fn match_structure(&self, world: &dyn World, anchor: BlockPos, facing: Direction) -> Option<&str> {
        let mut best: Option<&RitualInfo> = None;
        for info in self.iter() {
            if !info.enabled || info.components().is_empty() {
                continue;
            }
            if best.is_some_and(|b| b.components().len() >= info.components().len()) {
                continue;
            }
            if check_structure(world, anchor, facing, info.components()) {
                best = Some(info);
            }
        }
        best.map(|info| info.id.as_str())
    }
}
