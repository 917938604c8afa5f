//! Administrative pass-through surface.
//!
//! Operations a server operator runs against anchors: force-activate a
//! ritual without paying for it or building it, stop it, list running
//! anchors and inspect what a ritual's structure needs. These are thin
//! wrappers over [`RitualAnchor`] and [`RitualRegistry`]; the host maps
//! them onto its command system.

use std::collections::BTreeMap;

use crate::area::{AreaDescriptor, RangeLimits};
use crate::core::{BlockPos, Direction, OwnerId};
use crate::ritual::{
    missing_components, FailureReason, MarkerType, RitualAnchor, RitualComponent, RitualEnv, RitualRegistry,
    RitualResult, StopReason,
};
use crate::world::{BlockState, World};

/// Summary of one running anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorSummary {
    pub pos: BlockPos,
    pub owner: Option<OwnerId>,
    pub ritual: String,
    /// Ticks since activation.
    pub ticks: u64,
}

/// One declared range of a ritual.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeReport {
    pub key: String,
    pub default: AreaDescriptor,
    pub limits: RangeLimits,
}

/// What a ritual requires to be activated normally.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureReport {
    pub id: String,
    pub name: String,
    pub tier: u8,
    pub activation_cost: i64,
    pub refresh_cost: i64,
    pub refresh_time: u32,
    pub enabled: bool,
    /// Components relative to a north-facing anchor.
    pub components: Vec<RitualComponent>,
    /// Marker blocks needed, per marker type.
    pub marker_counts: BTreeMap<MarkerType, usize>,
    pub ranges: Vec<RangeReport>,
}

impl StructureReport {
    /// Total number of marker blocks.
    #[must_use]
    pub fn marker_total(&self) -> usize {
        self.components.len()
    }
}

/// Start a ritual on an anchor, skipping cost, structure, tier and
/// cooldown checks.
///
/// The ritual's own activation hook still runs and may cancel. An
/// unowned anchor is claimed by `owner`. A running ritual is stopped with
/// `Superseded` first.
pub fn force_activate(
    anchor: &mut RitualAnchor,
    registry: &RitualRegistry,
    env: &mut RitualEnv<'_>,
    ritual_id: &str,
    owner: Option<OwnerId>,
) -> RitualResult {
    let Some(mut ritual) = registry.create(ritual_id) else {
        log::debug!("force activation of unknown ritual `{}` at {}", ritual_id, anchor.pos());
        return RitualResult::failure(FailureReason::ActivationFailedGeneric);
    };
    if !ritual.activate(anchor, env, owner) {
        return RitualResult::failure(FailureReason::ActivationCancelled);
    }

    anchor.stop(env, StopReason::Superseded);
    anchor.claim(owner);
    log::info!("ritual `{}` force-activated at {}", ritual_id, anchor.pos());
    anchor.start(ritual);
    RitualResult::success()
}

/// Stop the ritual on an anchor. Returns false if nothing was running.
pub fn stop(anchor: &mut RitualAnchor, env: &mut RitualEnv<'_>) -> bool {
    anchor.stop(env, StopReason::Deactivated)
}

/// Running anchors among `anchors`, in the given order.
pub fn list_active<'a>(anchors: impl IntoIterator<Item = &'a RitualAnchor>) -> Vec<AnchorSummary> {
    anchors
        .into_iter()
        .filter_map(|anchor| {
            Some(AnchorSummary {
                pos: anchor.pos(),
                owner: anchor.owner(),
                ritual: anchor.active_ritual()?.to_string(),
                ticks: anchor.ticks(),
            })
        })
        .collect()
}

/// Structural requirements and effective values of a ritual.
#[must_use]
pub fn inspect(registry: &RitualRegistry, ritual_id: &str) -> Option<StructureReport> {
    let info = registry.info(ritual_id)?;
    let mut marker_counts = BTreeMap::new();
    for component in info.components() {
        *marker_counts.entry(component.marker).or_insert(0) += 1;
    }
    Some(StructureReport {
        id: info.id.clone(),
        name: info.name.clone(),
        tier: info.tier,
        activation_cost: info.activation_cost,
        refresh_cost: info.refresh_cost,
        refresh_time: info.refresh_time,
        enabled: info.enabled,
        components: info.components().to_vec(),
        marker_counts,
        ranges: info
            .ranges()
            .iter()
            .map(|r| RangeReport {
                key: r.key.clone(),
                default: r.default.clone(),
                limits: r.limits,
            })
            .collect(),
    })
}

/// World positions still missing their marker block, with the marker
/// each one needs.
#[must_use]
pub fn missing_markers(
    registry: &RitualRegistry,
    world: &dyn World,
    anchor: BlockPos,
    facing: Direction,
    ritual_id: &str,
) -> Option<Vec<(BlockPos, MarkerType)>> {
    let info = registry.info(ritual_id)?;
    Some(
        missing_components(world, anchor, facing, info.components())
            .into_iter()
            .map(|c| (c.position(anchor, facing), c.marker))
            .collect(),
    )
}

/// Place the marker blocks of a ritual around an anchor.
///
/// Returns the number of markers placed, or `None` for an unknown ritual.
pub fn build_structure(
    registry: &RitualRegistry,
    world: &mut dyn World,
    anchor: BlockPos,
    facing: Direction,
    ritual_id: &str,
) -> Option<usize> {
    let missing = missing_markers(registry, &*world, anchor, facing, ritual_id)?;
    let mut placed = 0;
    for (pos, marker) in missing {
        if world.replace_block(pos, BlockState::of(marker.block()), None) {
            placed += 1;
        } else {
            log::warn!("could not place {} marker at {}", marker, pos);
        }
    }
    Some(placed)
}
