//! Limits on player-resizable ranges.

use serde::{Deserialize, Serialize};

use crate::core::Message;

use super::AreaDescriptor;

/// Maximum size of a resizable range.
///
/// Horizontal and vertical radii are measured from the anchor; the volume
/// is the product of the three axis spans of the requested shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeLimits {
    pub max_volume: u64,
    pub max_horizontal: u32,
    pub max_vertical: u32,
}

impl RangeLimits {
    /// Create new limits.
    #[must_use]
    pub const fn new(max_volume: u64, max_horizontal: u32, max_vertical: u32) -> Self {
        Self {
            max_volume,
            max_horizontal,
            max_vertical,
        }
    }

    /// Check a candidate area against these limits.
    ///
    /// Volume is checked before bounds, so a request that violates both
    /// reports `VolumeTooLarge`.
    #[must_use]
    pub fn check(&self, candidate: &AreaDescriptor) -> RangeCheck {
        if candidate.volume() > self.max_volume {
            RangeCheck::VolumeTooLarge
        } else if !candidate.fits_radii(self.max_vertical, self.max_horizontal) {
            RangeCheck::OutOfBounds
        } else {
            RangeCheck::Success
        }
    }
}

/// Outcome of a range resize request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeCheck {
    /// The new range was accepted.
    Success,
    /// The requested volume exceeds the maximum.
    VolumeTooLarge,
    /// The requested shape reaches beyond the horizontal or vertical radius.
    OutOfBounds,
}

impl RangeCheck {
    /// Was the resize accepted?
    #[must_use]
    pub fn is_success(self) -> bool {
        self == RangeCheck::Success
    }

    /// Message for the player, parameterized by the range's limits.
    #[must_use]
    pub fn message(self, range_key: &str, limits: &RangeLimits) -> Message {
        match self {
            RangeCheck::Success => Message::new("ritual.essence_rituals.range.set").with_arg(range_key),
            RangeCheck::VolumeTooLarge => Message::new("ritual.essence_rituals.range.too_big")
                .with_arg(range_key)
                .with_arg(limits.max_volume),
            RangeCheck::OutOfBounds => Message::new("ritual.essence_rituals.range.out_of_bounds")
                .with_arg(range_key)
                .with_arg(limits.max_horizontal)
                .with_arg(limits.max_vertical),
        }
    }
}
