//! Ritual templates and the `Ritual` behavior trait.
//!
//! `RitualInfo` is the static description of a ritual: costs, interval,
//! tier, named ranges and structure. Every concrete ritual owns one and
//! exposes it through [`Ritual::info`]. Numeric tuning knobs live in
//! `settings`, a string-keyed map in the style of card attributes, so they
//! can be overridden from configuration without code changes.
//!
//! ## Example
//!
//! ```
//! use essence_rituals::area::{AreaDescriptor, RangeLimits};
//! use essence_rituals::core::BlockPos;
//! use essence_rituals::ritual::RitualInfo;
//!
//! let info = RitualInfo::new("water", "Ritual of the Full Spring")
//!     .with_costs(500, 25)
//!     .with_refresh_time(20)
//!     .with_range(
//!         "water_range",
//!         AreaDescriptor::rectangle(BlockPos::new(0, 1, 0), 1, 1, 1),
//!         RangeLimits::new(9, 3, 3),
//!     );
//!
//! assert_eq!(info.translation_key(), "ritual.essence_rituals.water");
//! assert_eq!(info.next_range_key("water_range"), Some("water_range"));
//! ```

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::anchor::RitualAnchor;
use super::component::RitualComponent;
use super::context::RitualEnv;
use super::result::StopReason;
use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{OwnerId, RitualOverrides};

/// A named, resizable range.
#[derive(Clone, Debug, PartialEq)]
pub struct RitualRange {
    pub key: String,
    /// Area used until the player resizes it.
    pub default: AreaDescriptor,
    pub limits: RangeLimits,
}

/// Static description of a ritual.
#[derive(Clone, Debug, PartialEq)]
pub struct RitualInfo {
    /// Registry id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Minimum activator tier.
    pub tier: u8,
    pub activation_cost: i64,
    /// Cost of one operation during a tick.
    pub refresh_cost: i64,
    /// Ticks between two performs.
    pub refresh_time: u32,
    pub enabled: bool,
    ranges: SmallVec<[RitualRange; 4]>,
    settings: FxHashMap<String, i64>,
    components: Vec<RitualComponent>,
}

impl RitualInfo {
    /// Create a template with zero costs, tier 0 and a 20 tick interval.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier: 0,
            activation_cost: 0,
            refresh_cost: 0,
            refresh_time: 20,
            enabled: true,
            ranges: SmallVec::new(),
            settings: FxHashMap::default(),
            components: Vec::new(),
        }
    }

    /// Set the tier requirement (builder pattern).
    #[must_use]
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    /// Set activation and refresh costs (builder pattern).
    #[must_use]
    pub fn with_costs(mut self, activation: i64, refresh: i64) -> Self {
        self.activation_cost = activation;
        self.refresh_cost = refresh;
        self
    }

    /// Set the refresh interval (builder pattern).
    #[must_use]
    pub fn with_refresh_time(mut self, ticks: u32) -> Self {
        self.refresh_time = ticks;
        self
    }

    /// Declare a range (builder pattern). Declaration order is cycling order.
    #[must_use]
    pub fn with_range(mut self, key: impl Into<String>, default: AreaDescriptor, limits: RangeLimits) -> Self {
        self.ranges.push(RitualRange {
            key: key.into(),
            default,
            limits,
        });
        self
    }

    /// Declare a numeric setting with its default (builder pattern).
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, default: i64) -> Self {
        self.settings.insert(key.into(), default);
        self
    }

    /// Set the structure (builder pattern).
    #[must_use]
    pub fn with_components(mut self, components: Vec<RitualComponent>) -> Self {
        self.components = components;
        self
    }

    /// Base translation key.
    #[must_use]
    pub fn translation_key(&self) -> String {
        format!("ritual.essence_rituals.{}", self.id)
    }

    /// Translation keys of the info pages: the ritual itself, then one per range.
    #[must_use]
    pub fn info_keys(&self) -> Vec<String> {
        let base = self.translation_key();
        std::iter::once(format!("{base}.info"))
            .chain(self.ranges.iter().map(|r| format!("{base}.{}.info", r.key)))
            .collect()
    }

    /// Marker blocks of the structure, facing north.
    #[must_use]
    pub fn components(&self) -> &[RitualComponent] {
        &self.components
    }

    /// Declared ranges in order.
    #[must_use]
    pub fn ranges(&self) -> &[RitualRange] {
        &self.ranges
    }

    /// Declared range keys in order.
    pub fn range_keys(&self) -> impl Iterator<Item = &str> {
        self.ranges.iter().map(|r| r.key.as_str())
    }

    /// A declared range.
    #[must_use]
    pub fn range(&self, key: &str) -> Option<&RitualRange> {
        self.ranges.iter().find(|r| r.key == key)
    }

    /// Default area of a declared range.
    #[must_use]
    pub fn default_range(&self, key: &str) -> Option<&AreaDescriptor> {
        self.range(key).map(|r| &r.default)
    }

    /// Limits of a declared range.
    #[must_use]
    pub fn limits(&self, key: &str) -> Option<RangeLimits> {
        self.range(key).map(|r| r.limits)
    }

    /// The range key after `current`, wrapping around.
    ///
    /// An unknown key maps to the first key. `None` only when the ritual has
    /// no ranges.
    #[must_use]
    pub fn next_range_key(&self, current: &str) -> Option<&str> {
        let next = match self.ranges.iter().position(|r| r.key == current) {
            Some(i) => (i + 1) % self.ranges.len(),
            None => 0,
        };
        self.ranges.get(next).map(|r| r.key.as_str())
    }

    /// Effective value of a setting. Undeclared settings read as 0.
    #[must_use]
    pub fn setting(&self, key: &str) -> i64 {
        self.settings.get(key).copied().unwrap_or(0)
    }

    /// Effective value of a setting as an unsigned count, clamped at 0.
    #[must_use]
    pub fn setting_u32(&self, key: &str) -> u32 {
        u32::try_from(self.setting(key).max(0)).unwrap_or(u32::MAX)
    }

    /// Effective value of a setting as a block offset, saturating at the
    /// `i32` bounds.
    #[must_use]
    pub fn setting_i32(&self, key: &str) -> i32 {
        let value = self.setting(key);
        i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
    }

    /// Apply configuration overrides in place.
    ///
    /// Range limits are only replaced for declared keys.
    pub fn apply_overrides(&mut self, overrides: &RitualOverrides) {
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
        if let Some(cost) = overrides.activation_cost {
            self.activation_cost = cost;
        }
        if let Some(cost) = overrides.refresh_cost {
            self.refresh_cost = cost;
        }
        if let Some(ticks) = overrides.refresh_time {
            self.refresh_time = ticks;
        }
        if let Some(tier) = overrides.tier {
            self.tier = tier;
        }
        for (key, limits) in &overrides.ranges {
            match self.ranges.iter_mut().find(|r| &r.key == key) {
                Some(range) => range.limits = *limits,
                None => log::warn!("ritual `{}` has no range `{}`; limit override ignored", self.id, key),
            }
        }
        for (key, value) in &overrides.settings {
            self.settings.insert(key.clone(), *value);
        }
    }
}

/// Behavior of a ritual.
///
/// Instances are created fresh for every activation and may hold state
/// between ticks. State that must survive a reload goes through
/// [`save_extra`](Ritual::save_extra) and [`load_extra`](Ritual::load_extra).
///
/// `perform` runs every `refresh_time` ticks while the ritual is active.
/// It must be safe at any balance: create a context, take a budget, act,
/// then spend the budget.
pub trait Ritual: std::fmt::Debug {
    /// The ritual's template with overrides applied.
    fn info(&self) -> &RitualInfo;

    /// Mutable template, used to apply overrides.
    fn info_mut(&mut self) -> &mut RitualInfo;

    /// Last check before activation succeeds. Returning false cancels it.
    fn activate(
        &mut self,
        _anchor: &RitualAnchor,
        _env: &mut RitualEnv<'_>,
        _activator: Option<OwnerId>,
    ) -> bool {
        true
    }

    /// Run one refresh.
    fn perform(&mut self, anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>);

    /// Undo anything that must not outlive the ritual.
    fn stop(&mut self, _anchor: &RitualAnchor, _env: &mut RitualEnv<'_>, _reason: StopReason) {}

    /// Ritual-specific state to persist with the anchor.
    fn save_extra(&self) -> Option<serde_json::Value> {
        None
    }

    /// Restore state written by `save_extra`.
    fn load_extra(&mut self, _extra: &serde_json::Value) -> Result<(), serde_json::Error> {
        Ok(())
    }
}
