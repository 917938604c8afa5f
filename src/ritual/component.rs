//! Structural signatures of rituals.
//!
//! A ritual's structure is a list of `RitualComponent`s: marker blocks at
//! offsets from the anchor. Structures are declared facing north and
//! rotated into the anchor's facing when checked.
//!
//! ## Example
//!
//! ```
//! use essence_rituals::core::{BlockPos, Direction};
//! use essence_rituals::ritual::{MarkerType, StructureBuilder, check_structure};
//! use essence_rituals::world::memory::MemoryWorld;
//!
//! let components = StructureBuilder::new()
//!     .parallel(1, 0, MarkerType::Water)
//!     .build();
//! assert_eq!(components.len(), 4);
//!
//! let mut world = MemoryWorld::new();
//! let anchor = BlockPos::new(0, 64, 0);
//! for c in &components {
//!     world.set_block(c.position(anchor, Direction::North), c.marker.block());
//! }
//! assert!(check_structure(&world, anchor, Direction::North, &components));
//! ```

use serde::{Deserialize, Serialize};

use crate::core::{BlockId, BlockPos, Direction};
use crate::world::World;

/// Marker block variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    Blank,
    Water,
    Fire,
    Earth,
    Air,
    Dusk,
    Dawn,
}

impl MarkerType {
    /// Every marker type.
    pub const ALL: [MarkerType; 7] = [
        MarkerType::Blank,
        MarkerType::Water,
        MarkerType::Fire,
        MarkerType::Earth,
        MarkerType::Air,
        MarkerType::Dusk,
        MarkerType::Dawn,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            MarkerType::Blank => "blank",
            MarkerType::Water => "water",
            MarkerType::Fire => "fire",
            MarkerType::Earth => "earth",
            MarkerType::Air => "air",
            MarkerType::Dusk => "dusk",
            MarkerType::Dawn => "dawn",
        }
    }

    /// The marker block for this type.
    #[must_use]
    pub const fn block(self) -> BlockId {
        BlockId::from_static(match self {
            MarkerType::Blank => "ritual_stone_blank",
            MarkerType::Water => "ritual_stone_water",
            MarkerType::Fire => "ritual_stone_fire",
            MarkerType::Earth => "ritual_stone_earth",
            MarkerType::Air => "ritual_stone_air",
            MarkerType::Dusk => "ritual_stone_dusk",
            MarkerType::Dawn => "ritual_stone_dawn",
        })
    }

    /// The marker type of a block, if it is a marker block.
    #[must_use]
    pub fn from_block(block: &BlockId) -> Option<Self> {
        Self::ALL.into_iter().find(|m| &m.block() == block)
    }
}

impl std::fmt::Display for MarkerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One marker block of a ritual structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RitualComponent {
    /// Offset from the anchor in the north-facing frame.
    pub offset: BlockPos,
    pub marker: MarkerType,
}

impl RitualComponent {
    /// Create a component.
    #[must_use]
    pub const fn new(offset: BlockPos, marker: MarkerType) -> Self {
        Self { offset, marker }
    }

    /// World position of this component for an anchor facing `facing`.
    #[must_use]
    pub fn position(&self, anchor: BlockPos, facing: Direction) -> BlockPos {
        anchor.offset(self.offset.rotated(facing))
    }

    /// Is the expected marker block in place?
    #[must_use]
    pub fn is_satisfied(&self, world: &dyn World, anchor: BlockPos, facing: Direction) -> bool {
        world.block_state(self.position(anchor, facing)).block == self.marker.block()
    }
}

/// Does every component have its marker block in place?
#[must_use]
pub fn check_structure(
    world: &dyn World,
    anchor: BlockPos,
    facing: Direction,
    components: &[RitualComponent],
) -> bool {
    components.iter().all(|c| c.is_satisfied(world, anchor, facing))
}

/// Components whose marker block is missing or wrong.
#[must_use]
pub fn missing_components(
    world: &dyn World,
    anchor: BlockPos,
    facing: Direction,
    components: &[RitualComponent],
) -> Vec<RitualComponent> {
    components
        .iter()
        .filter(|c| !c.is_satisfied(world, anchor, facing))
        .copied()
        .collect()
}

/// Builder for symmetric ritual structures.
///
/// The helpers mirror the usual layouts: four markers on the axes, four
/// on the corners, or eight at a knight-like offset.
#[derive(Clone, Debug, Default)]
pub struct StructureBuilder {
    components: Vec<RitualComponent>,
}

impl StructureBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One marker at `(x, y, z)`.
    #[must_use]
    pub fn single(mut self, x: i32, y: i32, z: i32, marker: MarkerType) -> Self {
        self.components
            .push(RitualComponent::new(BlockPos::new(x, y, z), marker));
        self
    }

    /// Four markers at distance `offset` on the x and z axes.
    #[must_use]
    pub fn parallel(self, offset: i32, y: i32, marker: MarkerType) -> Self {
        self.single(offset, y, 0, marker)
            .single(-offset, y, 0, marker)
            .single(0, y, offset, marker)
            .single(0, y, -offset, marker)
    }

    /// Four markers on the corners `(±offset, y, ±offset)`.
    #[must_use]
    pub fn corners(self, offset: i32, y: i32, marker: MarkerType) -> Self {
        self.single(offset, y, offset, marker)
            .single(offset, y, -offset, marker)
            .single(-offset, y, offset, marker)
            .single(-offset, y, -offset, marker)
    }

    /// Eight markers at `(±a, y, ±b)` and `(±b, y, ±a)`.
    #[must_use]
    pub fn offset(self, a: i32, b: i32, y: i32, marker: MarkerType) -> Self {
        self.single(a, y, b, marker)
            .single(b, y, a, marker)
            .single(a, y, -b, marker)
            .single(-b, y, a, marker)
            .single(-a, y, b, marker)
            .single(b, y, -a, marker)
            .single(-a, y, -b, marker)
            .single(-b, y, -a, marker)
    }

    /// A cross of `parallel` markers for every distance in `1..=reach`.
    #[must_use]
    pub fn cross(mut self, reach: i32, y: i32, marker: MarkerType) -> Self {
        for d in 1..=reach {
            self = self.parallel(d, y, marker);
        }
        self
    }

    /// Finish the structure.
    #[must_use]
    pub fn build(self) -> Vec<RitualComponent> {
        self.components
    }
}
