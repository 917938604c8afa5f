//! The ritual anchor: the block entity hosting an active ritual.
//!
//! The anchor owns the lifecycle of one ritual instance:
//!
//! - `activate`: validates and starts a fresh instance from the registry
//! - `tick`: counts down the cooldown and runs `perform` on the interval
//! - `stop`: runs the instance's stop hook and notifies the owner
//! - `set_range`: applies a player-requested resize
//! - `snapshot` / `restore`: persistence through `AnchorSnapshot`
//!
//! Messages for players are queued as [`Notification`]s; the host drains
//! and delivers them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::area::{AreaDescriptor, RangeCheck};
use crate::core::{BlockPos, Direction, Message, OwnerId, RitualError};

use super::component::check_structure;
use super::context::RitualEnv;
use super::registry::RitualRegistry;
use super::result::{FailureReason, RitualResult, StopReason};
use super::template::Ritual;

/// Who is activating a ritual, and with which tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Activator {
    pub player: Option<OwnerId>,
    /// Tier of the activation item.
    pub tier: u8,
}

impl Activator {
    /// A player activating with an item of `tier`.
    #[must_use]
    pub const fn player(player: OwnerId, tier: u8) -> Self {
        Self {
            player: Some(player),
            tier,
        }
    }

    /// An activation not attributed to any player, with the highest tier.
    #[must_use]
    pub const fn system() -> Self {
        Self {
            player: None,
            tier: u8::MAX,
        }
    }
}

/// A message queued for a player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub recipient: OwnerId,
    pub message: Message,
}

/// Anchor block entity.
#[derive(Debug)]
pub struct RitualAnchor {
    pos: BlockPos,
    owner: Option<OwnerId>,
    facing: Direction,
    cooldown: u32,
    powered: bool,
    ticks: u64,
    active: Option<Box<dyn Ritual>>,
    active_id: Option<String>,
    range_overrides: BTreeMap<String, AreaDescriptor>,
    stop_requested: bool,
    notifications: Vec<Notification>,
}

impl RitualAnchor {
    /// Create an idle, unowned anchor facing north.
    #[must_use]
    pub fn new(pos: BlockPos) -> Self {
        Self {
            pos,
            owner: None,
            facing: Direction::North,
            cooldown: 0,
            powered: false,
            ticks: 0,
            active: None,
            active_id: None,
            range_overrides: BTreeMap::new(),
            stop_requested: false,
            notifications: Vec::new(),
        }
    }

    /// Set the owner (builder pattern).
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the facing (builder pattern).
    #[must_use]
    pub fn with_facing(mut self, facing: Direction) -> Self {
        self.facing = facing;
        self
    }

    // === Accessors ===

    /// Anchor position.
    #[must_use]
    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    /// Owner paying for the ritual.
    #[must_use]
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    /// Facing of the structure.
    #[must_use]
    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Remaining cooldown ticks.
    #[must_use]
    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Block re-activation for `ticks`.
    pub fn set_cooldown(&mut self, ticks: u32) {
        self.cooldown = ticks;
    }

    /// Ticks since activation.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Is a redstone signal applied?
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Apply or remove a redstone signal. A powered anchor is paused.
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    /// Is a ritual running?
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active_id.is_some()
    }

    /// Id of the running ritual.
    #[must_use]
    pub fn active_ritual(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// The running ritual instance.
    ///
    /// `None` while the instance itself is executing.
    #[must_use]
    pub fn ritual(&self) -> Option<&dyn Ritual> {
        self.active.as_deref()
    }

    /// Player-resized area of a range.
    #[must_use]
    pub fn range_override(&self, key: &str) -> Option<&AreaDescriptor> {
        self.range_overrides.get(key)
    }

    /// Ask the anchor to stop the ritual with `Completed` after this perform.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Has the running ritual asked to stop?
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Take all queued notifications.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    fn notify(&mut self, message: Message) {
        if let Some(recipient) = self.owner {
            self.notifications.push(Notification { recipient, message });
        }
    }

    // === Lifecycle ===

    /// Activate a ritual by id.
    ///
    /// Nothing is deducted and nothing changes unless every check passes.
    pub fn activate(
        &mut self,
        registry: &RitualRegistry,
        env: &mut RitualEnv<'_>,
        ritual_id: &str,
        activator: Activator,
    ) -> RitualResult {
        let result = self.try_activate(registry, env, ritual_id, activator);
        if let Some(reason) = result.reason {
            log::debug!("activation of `{}` at {} failed: {}", ritual_id, self.pos, reason.name());
            if let Some(player) = activator.player {
                let name = registry.info(ritual_id).map_or(ritual_id, |info| info.name.as_str());
                self.notifications.push(Notification {
                    recipient: player,
                    message: result.message(name),
                });
            }
        }
        result
    }

    /// Activate whichever registered ritual matches the placed markers.
    pub fn activate_matching(
        &mut self,
        registry: &RitualRegistry,
        env: &mut RitualEnv<'_>,
        activator: Activator,
    ) -> RitualResult {
        match registry.match_structure(&*env.world, self.pos, self.facing) {
            Some(id) => {
                let id = id.to_string();
                self.activate(registry, env, &id, activator)
            }
            None => RitualResult::failure(FailureReason::StructureInvalid),
        }
    }

    fn try_activate(
        &mut self,
        registry: &RitualRegistry,
        env: &mut RitualEnv<'_>,
        ritual_id: &str,
        activator: Activator,
    ) -> RitualResult {
        let Some(mut ritual) = registry.create(ritual_id) else {
            return RitualResult::failure(FailureReason::ActivationFailedGeneric);
        };
        let info = ritual.info();

        if !info.enabled {
            return RitualResult::failure(FailureReason::RitualDisabled);
        }
        if activator.tier < info.tier {
            return RitualResult::failure_with(FailureReason::InsufficientTier, i64::from(info.tier));
        }

        let owner = self.owner.or(activator.player);
        let Some((owner, balance)) = owner.and_then(|o| env.essence.balance(o).map(|b| (o, b))) else {
            return RitualResult::failure(FailureReason::NoOwnerOrAccount);
        };

        let cost = info.activation_cost;
        if balance < cost {
            return RitualResult::failure_with(FailureReason::InsufficientResource, cost);
        }
        if !check_structure(&*env.world, self.pos, self.facing, info.components()) {
            return RitualResult::failure(FailureReason::StructureInvalid);
        }
        if self.cooldown > 0 {
            return RitualResult::failure_with(FailureReason::ActivationCancelled, i64::from(self.cooldown));
        }
        if !ritual.activate(self, env, activator.player) {
            return RitualResult::failure(FailureReason::ActivationCancelled);
        }

        self.stop(env, StopReason::Superseded);
        env.essence.spend(owner, cost, cost);
        self.owner = Some(owner);
        self.start(ritual);
        RitualResult::success()
    }

    /// Install an instance that already passed activation.
    pub(crate) fn start(&mut self, ritual: Box<dyn Ritual>) {
        let info = ritual.info();
        log::info!("ritual `{}` activated at {}", info.id, self.pos);
        let message = RitualResult::success().message(&info.name);
        self.active_id = Some(info.id.clone());
        self.active = Some(ritual);
        self.range_overrides.clear();
        self.ticks = 0;
        self.stop_requested = false;
        self.notify(message);
    }

    /// Take ownership for an activation that skips the account check.
    pub(crate) fn claim(&mut self, owner: Option<OwnerId>) {
        if self.owner.is_none() {
            self.owner = owner;
        }
    }

    /// Advance one simulation step.
    pub fn tick(&mut self, env: &mut RitualEnv<'_>) {
        if self.cooldown > 0 {
            self.cooldown -= 1;
        }
        if self.powered {
            return;
        }
        let Some(mut ritual) = self.active.take() else {
            return;
        };

        let interval = u64::from(ritual.info().refresh_time.max(1));
        if self.ticks % interval == 0 {
            ritual.perform(self, env);
        }
        self.ticks += 1;

        if self.stop_requested {
            self.finish(ritual, env, StopReason::Completed);
        } else {
            self.active = Some(ritual);
        }
    }

    /// Stop the running ritual. Returns false if nothing was running.
    pub fn stop(&mut self, env: &mut RitualEnv<'_>, reason: StopReason) -> bool {
        match self.active.take() {
            Some(ritual) => {
                self.finish(ritual, env, reason);
                true
            }
            None => false,
        }
    }

    fn finish(&mut self, mut ritual: Box<dyn Ritual>, env: &mut RitualEnv<'_>, reason: StopReason) {
        ritual.stop(self, env, reason);
        let info = ritual.info();
        log::info!("ritual `{}` at {} stopped: {}", info.id, self.pos, reason);
        let message = reason.message(&info.name);
        self.notify(message);
        self.active_id = None;
        self.range_overrides.clear();
        self.ticks = 0;
        self.stop_requested = false;
    }

    // === Ranges ===

    /// Resize a range from two offsets relative to the anchor.
    ///
    /// Volume is checked before the radii. Only `Success` stores the new
    /// area.
    pub fn set_range(&mut self, key: &str, first: BlockPos, second: BlockPos) -> Result<RangeCheck, RitualError> {
        let ritual = self.active.as_deref().ok_or(RitualError::NoActiveRitual)?;
        let info = ritual.info();
        let range = info.range(key).ok_or_else(|| RitualError::UnknownRange {
            ritual: info.id.clone(),
            key: key.to_string(),
        })?;

        let current = self.range_overrides.get(key).unwrap_or(&range.default);
        let candidate = current.from_offsets(first, second);
        let limits = range.limits;
        let check = limits.check(&candidate);

        if check.is_success() {
            self.range_overrides.insert(key.to_string(), candidate);
        } else {
            log::debug!("range `{}` at {} rejected: {:?}", key, self.pos, check);
        }
        self.notify(check.message(key, &limits));
        Ok(check)
    }

    /// The range key after `current` for the running ritual.
    #[must_use]
    pub fn next_range_key(&self, current: &str) -> Option<&str> {
        self.active.as_deref()?.info().next_range_key(current)
    }

    // === Persistence ===

    /// Capture the persisted document.
    #[must_use]
    pub fn snapshot(&self) -> AnchorSnapshot {
        AnchorSnapshot {
            pos: self.pos,
            owner: self.owner,
            facing: self.facing,
            cooldown: self.cooldown,
            ticks: self.ticks,
            powered: self.powered,
            active: self.active.as_deref().map(|ritual| ActiveSnapshot {
                ritual: ritual.info().id.clone(),
                ranges: self
                    .range_overrides
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                extra: ritual.save_extra(),
            }),
        }
    }

    /// Rebuild an anchor from a persisted document.
    ///
    /// Overrides for undeclared ranges are dropped. Unreadable extension
    /// state leaves the instance fresh.
    pub fn restore(snapshot: AnchorSnapshot, registry: &RitualRegistry) -> Result<Self, RitualError> {
        let mut anchor = Self::new(snapshot.pos);
        anchor.owner = snapshot.owner;
        anchor.facing = snapshot.facing;
        anchor.cooldown = snapshot.cooldown;
        anchor.ticks = snapshot.ticks;
        anchor.powered = snapshot.powered;

        let Some(active) = snapshot.active else {
            return Ok(anchor);
        };

        let mut ritual = registry
            .create(&active.ritual)
            .ok_or_else(|| RitualError::UnknownRitual(active.ritual.clone()))?;

        for (key, area) in active.ranges {
            if ritual.info().range(&key).is_some() {
                anchor.range_overrides.insert(key, area);
            } else {
                log::warn!("dropping override for unknown range `{}` of `{}`", key, active.ritual);
            }
        }

        if let Some(extra) = &active.extra {
            if let Err(err) = ritual.load_extra(extra) {
                log::warn!("discarding unreadable state of `{}` at {}: {}", active.ritual, snapshot.pos, err);
                ritual = registry
                    .create(&active.ritual)
                    .ok_or_else(|| RitualError::UnknownRitual(active.ritual.clone()))?;
            }
        }

        anchor.active_id = Some(active.ritual);
        anchor.active = Some(ritual);
        Ok(anchor)
    }

    /// Serialize the persisted document.
    pub fn to_json(&self) -> Result<String, RitualError> {
        serde_json::to_string(&self.snapshot()).map_err(RitualError::Snapshot)
    }

    /// Rebuild an anchor from a serialized document.
    pub fn from_json(text: &str, registry: &RitualRegistry) -> Result<Self, RitualError> {
        let snapshot: AnchorSnapshot = serde_json::from_str(text).map_err(RitualError::Snapshot)?;
        Self::restore(snapshot, registry)
    }
}

/// Persisted state of an anchor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorSnapshot {
    pub pos: BlockPos,
    #[serde(default)]
    pub owner: Option<OwnerId>,
    #[serde(default)]
    pub facing: Direction,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub ticks: u64,
    #[serde(default)]
    pub powered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveSnapshot>,
}

/// Persisted state of the running ritual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveSnapshot {
    pub ritual: String,
    /// Range overrides in key order.
    #[serde(default)]
    pub ranges: Vec<(String, AreaDescriptor)>,
    /// Ritual-specific state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}
