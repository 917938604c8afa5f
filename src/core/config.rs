//! Effective-value configuration.
//!
//! Ritual templates carry compiled-in defaults. Hosts load a
//! `RitualConfig` (typically from a data pack) that overrides any of them:
//! - `RitualOverrides`: costs, interval, tier, enabled flag, range limits,
//!   numeric tuning settings for one ritual
//! - `ImperfectStats`: catalyst block/tag, consume flag, enabled flag for
//!   one imperfect ritual
//!
//! Rituals always read the effective value; the registry applies these
//! overrides to every fresh instance it creates.
//!
//! ```
//! use essence_rituals::core::RitualConfig;
//!
//! let config = RitualConfig::from_json(r#"{
//!     "rituals": { "water": { "refresh_cost": 30, "enabled": false } },
//!     "imperfect": { "day": { "block": "diamond_block" } }
//! }"#).unwrap();
//!
//! assert!(!config.is_enabled("water"));
//! assert!(config.is_enabled("lava"));
//! assert_eq!(config.ritual("water").unwrap().refresh_cost, Some(30));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::RitualError;
use super::ids::{BlockId, TagId};
use crate::area::RangeLimits;

/// Overrides for one ritual. `None` keeps the template default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RitualOverrides {
    pub enabled: Option<bool>,
    pub activation_cost: Option<i64>,
    pub refresh_cost: Option<i64>,
    pub refresh_time: Option<u32>,
    pub tier: Option<u8>,
    /// Limits per range key.
    pub ranges: FxHashMap<String, RangeLimits>,
    /// Numeric tuning knobs per setting key.
    pub settings: FxHashMap<String, i64>,
}

impl RitualOverrides {
    /// Create empty overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the ritual.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Override the activation cost.
    #[must_use]
    pub fn with_activation_cost(mut self, cost: i64) -> Self {
        self.activation_cost = Some(cost);
        self
    }

    /// Override the per-operation refresh cost.
    #[must_use]
    pub fn with_refresh_cost(mut self, cost: i64) -> Self {
        self.refresh_cost = Some(cost);
        self
    }

    /// Override the refresh interval in ticks.
    #[must_use]
    pub fn with_refresh_time(mut self, ticks: u32) -> Self {
        self.refresh_time = Some(ticks);
        self
    }

    /// Override the tier requirement.
    #[must_use]
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Override the limits of one range.
    #[must_use]
    pub fn with_range_limits(mut self, key: impl Into<String>, limits: RangeLimits) -> Self {
        self.ranges.insert(key.into(), limits);
        self
    }

    /// Override a numeric setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: i64) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Declarative stats for an imperfect ritual.
///
/// When `block` is set the ritual is matched exactly; otherwise when `tag`
/// is set it is matched by tag membership. With neither, the ritual's own
/// predicate is used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImperfectStats {
    pub block: Option<BlockId>,
    pub tag: Option<TagId>,
    pub activation_cost: Option<i64>,
    /// Remove the catalyst block after a successful activation.
    pub consume: bool,
    pub enabled: bool,
}

impl Default for ImperfectStats {
    fn default() -> Self {
        Self {
            block: None,
            tag: None,
            activation_cost: None,
            consume: false,
            enabled: true,
        }
    }
}

impl ImperfectStats {
    /// Stats matching an exact block.
    #[must_use]
    pub fn block(block: BlockId) -> Self {
        Self {
            block: Some(block),
            ..Self::default()
        }
    }

    /// Stats matching a tag.
    #[must_use]
    pub fn tag(tag: TagId) -> Self {
        Self {
            tag: Some(tag),
            ..Self::default()
        }
    }

    /// Consume the catalyst on use.
    #[must_use]
    pub fn consuming(mut self) -> Self {
        self.consume = true;
        self
    }

    /// Enable or disable the ritual.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override the activation cost.
    #[must_use]
    pub fn with_activation_cost(mut self, cost: i64) -> Self {
        self.activation_cost = Some(cost);
        self
    }
}

/// Complete ritual configuration for one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RitualConfig {
    /// Overrides per ritual id.
    pub rituals: FxHashMap<String, RitualOverrides>,
    /// Stats per imperfect ritual id.
    pub imperfect: FxHashMap<String, ImperfectStats>,
}

impl RitualConfig {
    /// Create an empty configuration (all template defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document.
    pub fn from_json(text: &str) -> Result<Self, RitualError> {
        serde_json::from_str(text).map_err(RitualError::Config)
    }

    /// Serialize this configuration.
    pub fn to_json(&self) -> Result<String, RitualError> {
        serde_json::to_string_pretty(self).map_err(RitualError::Config)
    }

    /// Add overrides for a ritual.
    #[must_use]
    pub fn with_ritual(mut self, id: impl Into<String>, overrides: RitualOverrides) -> Self {
        self.rituals.insert(id.into(), overrides);
        self
    }

    /// Add stats for an imperfect ritual.
    #[must_use]
    pub fn with_imperfect(mut self, id: impl Into<String>, stats: ImperfectStats) -> Self {
        self.imperfect.insert(id.into(), stats);
        self
    }

    /// Overrides for a ritual, if any.
    #[must_use]
    pub fn ritual(&self, id: &str) -> Option<&RitualOverrides> {
        self.rituals.get(id)
    }

    /// Stats for an imperfect ritual, if any.
    #[must_use]
    pub fn imperfect_stats(&self, id: &str) -> Option<&ImperfectStats> {
        self.imperfect.get(id)
    }

    /// Is the ritual enabled? Rituals without overrides are enabled.
    #[must_use]
    pub fn is_enabled(&self, id: &str) -> bool {
        self.ritual(id).and_then(|o| o.enabled).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_builder() {
        let overrides = RitualOverrides::new()
            .with_activation_cost(100)
            .with_refresh_cost(3)
            .with_refresh_time(5)
            .with_tier(1)
            .with_range_limits("water_range", RangeLimits::new(27, 1, 1))
            .with_setting("credit_cap", 50);

        assert_eq!(overrides.activation_cost, Some(100));
        assert_eq!(overrides.refresh_time, Some(5));
        assert_eq!(overrides.ranges["water_range"].max_volume, 27);
        assert_eq!(overrides.settings["credit_cap"], 50);
        assert_eq!(overrides.enabled, None);
    }

    #[test]
    fn test_imperfect_stats_defaults() {
        let stats: ImperfectStats = serde_json::from_str("{}").unwrap();
        assert!(stats.enabled);
        assert!(!stats.consume);
        assert!(stats.block.is_none());
        assert!(stats.tag.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = RitualConfig::new()
            .with_ritual("lava", RitualOverrides::new().with_enabled(false))
            .with_imperfect("frost", ImperfectStats::tag(TagId::ICE).consuming());

        let json = config.to_json().unwrap();
        let back = RitualConfig::from_json(&json).unwrap();
        assert_eq!(config, back);
        assert!(!back.is_enabled("lava"));
        assert!(back.imperfect_stats("frost").unwrap().consume);
    }

    #[test]
    fn test_invalid_json() {
        let err = RitualConfig::from_json("{\"rituals\": 3}").unwrap_err();
        assert!(matches!(err, RitualError::Config(_)));
    }

    #[test]
    fn test_range_limits_from_json() {
        let config = RitualConfig::from_json(
            r#"{"rituals":{"water":{"ranges":{"water_range":{"max_volume":8,"max_horizontal":2,"max_vertical":1}}}}}"#,
        )
        .unwrap();
        let limits = config.ritual("water").unwrap().ranges["water_range"];
        assert_eq!(limits, RangeLimits::new(8, 2, 1));
    }
}
