//! Item stacks moved in and out of containers.

use serde::{Deserialize, Serialize};

use crate::core::{BlockPos, ItemId};

/// A stack of identical items.
///
/// A stack may carry a bound position (a teleport focus remembers its
/// destination that way). A stack with `count == 0` is empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_pos: Option<BlockPos>,
}

impl ItemStack {
    /// Create a new stack.
    #[must_use]
    pub fn new(item: ItemId, count: u32) -> Self {
        Self {
            item,
            count,
            bound_pos: None,
        }
    }

    /// Bind a position to this stack (builder pattern).
    #[must_use]
    pub fn bound_to(mut self, pos: BlockPos) -> Self {
        self.bound_pos = Some(pos);
        self
    }

    /// An empty stack of the same item.
    #[must_use]
    pub fn emptied(&self) -> Self {
        Self {
            count: 0,
            ..self.clone()
        }
    }

    /// Is this stack empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Can `other` merge into this stack?
    #[must_use]
    pub fn stacks_with(&self, other: &ItemStack) -> bool {
        self.item == other.item && self.bound_pos == other.bound_pos
    }

    /// Split off up to `amount` items into a new stack.
    #[must_use]
    pub fn split(&mut self, amount: u32) -> ItemStack {
        let taken = amount.min(self.count);
        self.count -= taken;
        Self {
            count: taken,
            ..self.clone()
        }
    }
}
