//! Area descriptors: the shapes rituals act on.
//!
//! A descriptor is expressed relative to the ritual anchor. It knows its
//! bounding box, can enumerate the block positions it contains, and can be
//! rebuilt from two player-selected offsets when a range is resized.

use serde::{Deserialize, Serialize};

use crate::core::{BlockBox, BlockPos};

/// Shape of a ritual range, relative to the anchor.
///
/// Sizes and radii are unsigned, so volumes are never negative.
///
/// ```
/// use essence_rituals::area::AreaDescriptor;
/// use essence_rituals::core::BlockPos;
///
/// let area = AreaDescriptor::rectangle(BlockPos::new(-1, 1, -1), 3, 1, 3);
/// let anchor = BlockPos::new(10, 64, 10);
///
/// assert_eq!(area.volume(), 9);
/// assert_eq!(area.contained_positions(anchor).count(), 9);
/// assert!(area.contained_positions(anchor).all(|p| p.y == 65));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AreaDescriptor {
    /// Axis-aligned box starting at `offset`.
    Rectangle {
        offset: BlockPos,
        /// Span along x.
        width: u32,
        /// Span along y.
        height: u32,
        /// Span along z.
        depth: u32,
    },
    /// Upper half of a sphere centered on `center`.
    Hemisphere { center: BlockPos, radius: u32 },
}

impl AreaDescriptor {
    /// Create a rectangle.
    #[must_use]
    pub const fn rectangle(offset: BlockPos, width: u32, height: u32, depth: u32) -> Self {
        Self::Rectangle {
            offset,
            width,
            height,
            depth,
        }
    }

    /// Create a cube of side `size`.
    #[must_use]
    pub const fn cube(offset: BlockPos, size: u32) -> Self {
        Self::rectangle(offset, size, size, size)
    }

    /// Create a hemisphere.
    #[must_use]
    pub const fn hemisphere(center: BlockPos, radius: u32) -> Self {
        Self::Hemisphere { center, radius }
    }

    /// Extent relative to the anchor in wide coordinates: inclusive min and
    /// exclusive max per axis. Never overflows, whatever the offsets.
    fn extent(&self) -> ([i64; 3], [i64; 3]) {
        match *self {
            Self::Rectangle {
                offset,
                width,
                height,
                depth,
            } => {
                let min = wide(offset);
                (min, [min[0] + i64::from(width), min[1] + i64::from(height), min[2] + i64::from(depth)])
            }
            Self::Hemisphere { center, radius } => {
                let [x, y, z] = wide(center);
                let r = i64::from(radius);
                ([x - r, y, z - r], [x + r + 1, y + r + 1, z + r + 1])
            }
        }
    }

    /// Bounding box relative to the anchor, clamped to representable
    /// coordinates.
    #[must_use]
    pub fn relative_box(&self) -> BlockBox {
        let (min, max) = self.extent();
        BlockBox {
            min: narrow(min),
            max: narrow(max),
        }
    }

    /// Bounding box in world coordinates for an anchor.
    #[must_use]
    pub fn bounding_box(&self, anchor: BlockPos) -> BlockBox {
        self.relative_box().offset(anchor)
    }

    /// Every world position inside the area.
    ///
    /// The sequence is finite and restartable: calling again yields the
    /// same positions in the same order (y, then x, then z).
    pub fn contained_positions(&self, anchor: BlockPos) -> impl Iterator<Item = BlockPos> + '_ {
        self.relative_box()
            .positions()
            .filter(move |offset| self.is_within_area(*offset))
            .map(move |offset| offset.offset(anchor))
    }

    /// Is this anchor-relative offset inside the area?
    #[must_use]
    pub fn is_within_area(&self, offset: BlockPos) -> bool {
        match *self {
            Self::Rectangle { .. } => self.relative_box().contains(offset),
            Self::Hemisphere { center, radius } => {
                let r = i64::from(radius);
                offset.y >= center.y && offset.distance_sq(center) <= r.saturating_mul(r)
            }
        }
    }

    /// Product of the three axis spans of the bounding box, saturating at
    /// `u64::MAX`.
    #[must_use]
    pub fn volume(&self) -> u64 {
        let (min, max) = self.extent();
        (0..3)
            .map(|axis| u64::try_from(max[axis] - min[axis]).unwrap_or(0))
            .fold(1u64, u64::saturating_mul)
    }

    /// Rebuild an area of the same shape from two selected offsets.
    ///
    /// - Rectangle: the inclusive box spanned by both offsets.
    /// - Hemisphere: centered on `first`, radius reaching `second`.
    #[must_use]
    pub fn from_offsets(&self, first: BlockPos, second: BlockPos) -> Self {
        match self {
            Self::Rectangle { .. } => {
                let min = BlockPos::new(first.x.min(second.x), first.y.min(second.y), first.z.min(second.z));
                let max = BlockPos::new(first.x.max(second.x), first.y.max(second.y), first.z.max(second.z));
                Self::Rectangle {
                    offset: min,
                    width: span(min.x, max.x),
                    height: span(min.y, max.y),
                    depth: span(min.z, max.z),
                }
            }
            Self::Hemisphere { .. } => {
                let radius = (first.distance_sq(second) as f64).sqrt().round();
                Self::Hemisphere {
                    center: first,
                    radius: radius.min(f64::from(u32::MAX)) as u32,
                }
            }
        }
    }

    /// Would the area rebuilt from these offsets stay within the radii?
    ///
    /// Horizontal limits apply to x and z, the vertical limit to y; both are
    /// measured from the anchor.
    #[must_use]
    pub fn is_within_limits(
        &self,
        first: BlockPos,
        second: BlockPos,
        max_vertical: u32,
        max_horizontal: u32,
    ) -> bool {
        self.from_offsets(first, second)
            .fits_radii(max_vertical, max_horizontal)
    }

    /// Does this area stay within the radii around the anchor?
    #[must_use]
    pub fn fits_radii(&self, max_vertical: u32, max_horizontal: u32) -> bool {
        let (min, max) = self.extent();
        let h = i64::from(max_horizontal);
        let v = i64::from(max_vertical);
        let within = |axis: usize, limit: i64| min[axis] >= -limit && max[axis] - 1 <= limit;
        within(0, h) && within(2, h) && within(1, v)
    }
}

fn wide(pos: BlockPos) -> [i64; 3] {
    [i64::from(pos.x), i64::from(pos.y), i64::from(pos.z)]
}

fn narrow(coords: [i64; 3]) -> BlockPos {
    let clamp = |v: i64| i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX });
    BlockPos::new(clamp(coords[0]), clamp(coords[1]), clamp(coords[2]))
}

fn span(min: i32, max: i32) -> u32 {
    u32::try_from(i64::from(max) - i64::from(min) + 1).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_box() {
        let area = AreaDescriptor::rectangle(BlockPos::new(-2, 1, -2), 5, 2, 5);
        let bb = area.bounding_box(BlockPos::new(100, 10, 100));
        assert_eq!(bb.min, BlockPos::new(98, 11, 98));
        assert_eq!(bb.max, BlockPos::new(103, 13, 103));
        assert_eq!(area.volume(), 50);
        assert_eq!(area.contained_positions(BlockPos::ZERO).count(), 50);
    }

    #[test]
    fn test_positions_restartable() {
        let area = AreaDescriptor::hemisphere(BlockPos::ZERO, 3);
        let first: Vec<_> = area.contained_positions(BlockPos::new(5, 5, 5)).collect();
        let second: Vec<_> = area.contained_positions(BlockPos::new(5, 5, 5)).collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_hemisphere_membership() {
        let area = AreaDescriptor::hemisphere(BlockPos::ZERO, 2);
        assert!(area.is_within_area(BlockPos::new(0, 0, 0)));
        assert!(area.is_within_area(BlockPos::new(0, 2, 0)));
        assert!(area.is_within_area(BlockPos::new(2, 0, 0)));
        assert!(!area.is_within_area(BlockPos::new(0, -1, 0)));
        assert!(!area.is_within_area(BlockPos::new(2, 2, 0)));
        assert!(!area.is_within_area(BlockPos::new(0, 3, 0)));
    }

    #[test]
    fn test_hemisphere_positions_within_box() {
        let area = AreaDescriptor::hemisphere(BlockPos::new(0, 1, 0), 4);
        let anchor = BlockPos::new(-7, 3, 12);
        let bb = area.bounding_box(anchor);
        for pos in area.contained_positions(anchor) {
            assert!(bb.contains(pos));
            assert!(area.is_within_area(pos.relative_to(anchor)));
        }
    }

    #[test]
    fn test_zero_sized_rectangle_is_empty() {
        let area = AreaDescriptor::rectangle(BlockPos::ZERO, 0, 3, 3);
        assert_eq!(area.volume(), 0);
        assert_eq!(area.contained_positions(BlockPos::ZERO).count(), 0);
    }

    #[test]
    fn test_from_offsets_rectangle_any_corner_order() {
        let base = AreaDescriptor::cube(BlockPos::ZERO, 1);
        let a = base.from_offsets(BlockPos::new(2, 0, -1), BlockPos::new(-1, 3, 1));
        let b = base.from_offsets(BlockPos::new(-1, 3, 1), BlockPos::new(2, 0, -1));
        assert_eq!(a, b);
        assert_eq!(a, AreaDescriptor::rectangle(BlockPos::new(-1, 0, -1), 4, 4, 3));
    }

    #[test]
    fn test_from_offsets_hemisphere() {
        let base = AreaDescriptor::hemisphere(BlockPos::ZERO, 1);
        let resized = base.from_offsets(BlockPos::new(0, 1, 0), BlockPos::new(3, 1, 4));
        assert_eq!(resized, AreaDescriptor::hemisphere(BlockPos::new(0, 1, 0), 5));
    }

    #[test]
    fn test_within_limits() {
        let base = AreaDescriptor::cube(BlockPos::ZERO, 1);
        assert!(base.is_within_limits(BlockPos::new(-5, 0, -5), BlockPos::new(5, 5, 5), 5, 5));
        assert!(!base.is_within_limits(BlockPos::new(-6, 0, -5), BlockPos::new(5, 5, 5), 5, 5));
        assert!(!base.is_within_limits(BlockPos::new(-5, 0, -5), BlockPos::new(5, 6, 5), 5, 5));
        assert!(!base.is_within_limits(BlockPos::new(-5, -6, -5), BlockPos::new(5, 0, 5), 5, 5));
    }

    #[test]
    fn test_serialization() {
        let area = AreaDescriptor::hemisphere(BlockPos::new(0, -2, 0), 7);
        let json = serde_json::to_string(&area).unwrap();
        assert!(json.contains("\"shape\":\"hemisphere\""));
        let back: AreaDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(area, back);
    }

    #[test]
    fn test_extreme_offsets_do_not_overflow() {
        let base = AreaDescriptor::cube(BlockPos::ZERO, 1);
        let huge = base.from_offsets(BlockPos::new(i32::MIN, i32::MIN, i32::MIN), BlockPos::new(i32::MAX, i32::MAX, i32::MAX));
        assert_eq!(huge.volume(), u64::MAX);
        assert!(!huge.fits_radii(1000, 1000));

        let far = AreaDescriptor::rectangle(BlockPos::new(i32::MAX, 0, 0), u32::MAX, 1, 1);
        assert_eq!(far.volume(), u64::from(u32::MAX));
        assert!(!far.fits_radii(u32::MAX, u32::MAX));
        assert_eq!(far.relative_box().max.x, i32::MAX);

        let sphere = AreaDescriptor::hemisphere(BlockPos::ZERO, 1).from_offsets(BlockPos::ZERO, BlockPos::new(i32::MAX, 0, 0));
        let AreaDescriptor::Hemisphere { radius, .. } = sphere else {
            panic!("resize changed the shape");
        };
        assert!(radius >= 2_147_483_646);
        assert!(!sphere.fits_radii(10, 10));
        assert!(sphere.volume() > 1_000_000);
        assert!(sphere.is_within_area(BlockPos::new(0, 5, 0)));
    }
}
