//! Identifier types.
//!
//! Blocks, tags and items are identified by name. The engine never
//! interprets names beyond the handful of well-known ids below; the host
//! registry assigns meaning.
//!
//! Entities are identified by a host-allocated number and owners by UUID.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Block identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub Cow<'static, str>);

impl BlockId {
    pub const AIR: BlockId = BlockId::from_static("air");
    pub const WATER: BlockId = BlockId::from_static("water");
    pub const LAVA: BlockId = BlockId::from_static("lava");
    pub const STONE: BlockId = BlockId::from_static("stone");
    pub const COBBLESTONE: BlockId = BlockId::from_static("cobblestone");
    pub const STONE_BRICKS: BlockId = BlockId::from_static("stone_bricks");
    pub const ICE: BlockId = BlockId::from_static("ice");
    pub const BEDROCK: BlockId = BlockId::from_static("bedrock");

    /// Create a block id from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a block id from any name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The block name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The item that places this block.
    #[must_use]
    pub fn item(&self) -> ItemId {
        ItemId(self.0.clone())
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for BlockId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Block tag identifier (a named set of blocks).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagId(pub Cow<'static, str>);

impl TagId {
    pub const LOGS: TagId = TagId::from_static("logs");
    pub const LEAVES: TagId = TagId::from_static("leaves");
    pub const ORES: TagId = TagId::from_static("ores");
    pub const CROPS: TagId = TagId::from_static("crops");
    pub const ICE: TagId = TagId::from_static("ice");
    pub const UNBREAKABLE: TagId = TagId::from_static("unbreakable");

    /// Create a tag id from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a tag id from any name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }
}

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Item identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub Cow<'static, str>);

impl ItemId {
    /// Create an item id from a static name.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an item id from any name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The item name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an essence owner (a player).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    /// Create a random owner id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a deterministic owner id, convenient for tests and tooling.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Owner({})", self.0)
    }
}

/// Host-allocated entity identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create a new entity ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_and_owned_ids_compare_equal() {
        assert_eq!(BlockId::new("water"), BlockId::WATER);
        assert_eq!(TagId::new("logs"), TagId::LOGS);
        assert_eq!(BlockId::STONE.item(), ItemId::from_static("stone"));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", BlockId::LAVA), "lava");
        assert_eq!(format!("{}", TagId::ORES), "#ores");
        assert_eq!(format!("{}", EntityId(7)), "Entity(7)");
    }

    #[test]
    fn test_owner_id_serialization() {
        let owner = OwnerId::from_u128(42);
        let json = serde_json::to_string(&owner).unwrap();
        let back: OwnerId = serde_json::from_str(&json).unwrap();
        assert_eq!(owner, back);
    }
}
