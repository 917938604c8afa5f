//! Block states as seen by rituals.

use serde::{Deserialize, Serialize};

use crate::core::BlockId;

/// Highest growth stage of a crop.
pub const CROP_MAX_AGE: u8 = 7;

/// A block and its single numeric property.
///
/// `age` is the growth stage for crops and the flow level for fluids
/// (0 is a source block). Other blocks keep it at 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub block: BlockId,
    #[serde(default)]
    pub age: u8,
}

impl BlockState {
    /// The empty block.
    pub const AIR: BlockState = BlockState::of(BlockId::AIR);

    /// A block with age 0.
    #[must_use]
    pub const fn of(block: BlockId) -> Self {
        Self { block, age: 0 }
    }

    /// Set the age (builder pattern).
    #[must_use]
    pub fn with_age(mut self, age: u8) -> Self {
        self.age = age;
        self
    }

    /// Is this the empty block?
    #[must_use]
    pub fn is_air(&self) -> bool {
        self.block == BlockId::AIR
    }

    /// Is this a fluid (source or flowing)?
    #[must_use]
    pub fn is_fluid(&self) -> bool {
        self.block == BlockId::WATER || self.block == BlockId::LAVA
    }

    /// Is this a fluid source block?
    #[must_use]
    pub fn is_fluid_source(&self) -> bool {
        self.is_fluid() && self.age == 0
    }

    /// Is this a water source block?
    #[must_use]
    pub fn is_water_source(&self) -> bool {
        self.block == BlockId::WATER && self.age == 0
    }

    /// Can a placement replace this block without breaking it?
    #[must_use]
    pub fn is_replaceable(&self) -> bool {
        self.is_air() || (self.is_fluid() && self.age > 0)
    }
}

impl From<BlockId> for BlockState {
    fn from(block: BlockId) -> Self {
        Self::of(block)
    }
}
