//! World geometry: block positions, entity positions, facings, boxes.
//!
//! ## Coordinate Conventions
//!
//! - `BlockPos`: integer block coordinates, `y` is up.
//! - `Vec3`: continuous entity coordinates. The block at `(x, y, z)`
//!   spans `[x, x + 1)` on every axis.
//! - `BlockBox`: an axis-aligned box with inclusive `min` and exclusive
//!   `max`, so an empty box has `min == max` on some axis.
//!
//! ```
//! use essence_rituals::core::{BlockBox, BlockPos, Vec3};
//!
//! let bb = BlockBox::new(BlockPos::new(0, 0, 0), BlockPos::new(2, 1, 2));
//! assert_eq!(bb.volume(), 4);
//! assert!(bb.contains(BlockPos::new(1, 0, 1)));
//! assert!(!bb.contains(BlockPos::new(2, 0, 0)));
//! assert!(bb.contains_point(Vec3::new(1.5, 0.2, 0.0)));
//! ```

use serde::{Deserialize, Serialize};

/// An integer block position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// The origin.
    pub const ZERO: BlockPos = BlockPos::new(0, 0, 0);

    /// Create a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset this position by another position treated as a vector.
    #[must_use]
    pub const fn offset(self, by: BlockPos) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.z + by.z)
    }

    /// Offset by raw deltas.
    #[must_use]
    pub const fn add(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Offset by raw deltas, clamping at the coordinate bounds.
    #[must_use]
    pub const fn saturating_add(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.z.saturating_add(dz))
    }

    /// Difference `self - other`.
    #[must_use]
    pub const fn relative_to(self, other: BlockPos) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// The position directly above.
    #[must_use]
    pub const fn above(self) -> Self {
        self.add(0, 1, 0)
    }

    /// The position directly below.
    #[must_use]
    pub const fn below(self) -> Self {
        self.add(0, -1, 0)
    }

    /// Squared euclidean distance to another position.
    #[must_use]
    pub fn distance_sq(self, other: BlockPos) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        let dz = i64::from(self.z) - i64::from(other.z);
        dx.saturating_mul(dx)
            .saturating_add(dy.saturating_mul(dy))
            .saturating_add(dz.saturating_mul(dz))
    }

    /// Center of the block as an entity position.
    #[must_use]
    pub fn center(self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 0.5,
            f64::from(self.z) + 0.5,
        )
    }

    /// Bottom center of the block, where a standing entity would be placed.
    #[must_use]
    pub fn bottom_center(self) -> Vec3 {
        Vec3::new(f64::from(self.x) + 0.5, f64::from(self.y), f64::from(self.z) + 0.5)
    }

    /// Rotate this offset from the north-facing frame into `facing`.
    ///
    /// Ritual structures are declared facing north. Vertical facings leave
    /// the offset unchanged.
    #[must_use]
    pub const fn rotated(self, facing: Direction) -> Self {
        match facing {
            Direction::North | Direction::Up | Direction::Down => self,
            Direction::East => Self::new(-self.z, self.y, self.x),
            Direction::South => Self::new(-self.x, self.y, -self.z),
            Direction::West => Self::new(self.z, self.y, -self.x),
        }
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A continuous position or velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    /// Create a new vector.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum.
    #[must_use]
    pub fn add(self, other: Vec3) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn sub(self, other: Vec3) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Scale every component.
    #[must_use]
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or zero for a zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len < 1.0e-4 {
            Self::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }

    /// The block containing this point.
    #[must_use]
    pub fn block_pos(self) -> BlockPos {
        BlockPos::new(self.x.floor() as i32, self.y.floor() as i32, self.z.floor() as i32)
    }
}

/// One of the six axis directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Direction {
    /// All horizontal directions, clockwise from north.
    pub const HORIZONTAL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    /// Unit step along this direction.
    #[must_use]
    pub const fn step(self) -> BlockPos {
        match self {
            Direction::North => BlockPos::new(0, 0, -1),
            Direction::East => BlockPos::new(1, 0, 0),
            Direction::South => BlockPos::new(0, 0, 1),
            Direction::West => BlockPos::new(-1, 0, 0),
            Direction::Up => BlockPos::new(0, 1, 0),
            Direction::Down => BlockPos::new(0, -1, 0),
        }
    }

    /// Unit step as a continuous vector.
    #[must_use]
    pub fn unit(self) -> Vec3 {
        let s = self.step();
        Vec3::new(f64::from(s.x), f64::from(s.y), f64::from(s.z))
    }
}

/// Axis-aligned box of blocks, `min` inclusive and `max` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BlockBox {
    /// Create a box from its corners. Corners are normalized so that
    /// `min <= max` on every axis.
    #[must_use]
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box covering exactly one block.
    #[must_use]
    pub fn single(pos: BlockPos) -> Self {
        Self { min: pos, max: pos.add(1, 1, 1) }
    }

    /// Translate the box.
    #[must_use]
    pub fn offset(self, by: BlockPos) -> Self {
        Self {
            min: self.min.saturating_add(by.x, by.y, by.z),
            max: self.max.saturating_add(by.x, by.y, by.z),
        }
    }

    /// Grow the box by `amount` on every side.
    #[must_use]
    pub fn inflate(self, amount: i32) -> Self {
        Self {
            min: self.min.add(-amount, -amount, -amount),
            max: self.max.add(amount, amount, amount),
        }
    }

    /// Span along x.
    #[must_use]
    pub fn size_x(&self) -> u64 {
        u64::try_from(i64::from(self.max.x) - i64::from(self.min.x)).unwrap_or(0)
    }

    /// Span along y.
    #[must_use]
    pub fn size_y(&self) -> u64 {
        u64::try_from(i64::from(self.max.y) - i64::from(self.min.y)).unwrap_or(0)
    }

    /// Span along z.
    #[must_use]
    pub fn size_z(&self) -> u64 {
        u64::try_from(i64::from(self.max.z) - i64::from(self.min.z)).unwrap_or(0)
    }

    /// Number of blocks inside the box.
    #[must_use]
    pub fn volume(&self) -> u64 {
        self.size_x().saturating_mul(self.size_y()).saturating_mul(self.size_z())
    }

    /// Does the box contain this block?
    #[must_use]
    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x < self.max.x
            && pos.y >= self.min.y
            && pos.y < self.max.y
            && pos.z >= self.min.z
            && pos.z < self.max.z
    }

    /// Does the box contain this continuous point?
    #[must_use]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= f64::from(self.min.x)
            && p.x < f64::from(self.max.x)
            && p.y >= f64::from(self.min.y)
            && p.y < f64::from(self.max.y)
            && p.z >= f64::from(self.min.z)
            && p.z < f64::from(self.max.z)
    }

    /// Geometric center.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (f64::from(self.min.x) + f64::from(self.max.x)) / 2.0,
            (f64::from(self.min.y) + f64::from(self.max.y)) / 2.0,
            (f64::from(self.min.z) + f64::from(self.max.z)) / 2.0,
        )
    }

    /// Iterate every block in the box, ordered by y, then x, then z.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + Clone {
        let (min, max) = (self.min, self.max);
        (min.y..max.y).flat_map(move |y| {
            (min.x..max.x).flat_map(move |x| (min.z..max.z).map(move |z| BlockPos::new(x, y, z)))
        })
    }
}
