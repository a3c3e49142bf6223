//! The item entity: identity, type, stack count and current location.

use crate::ids::{ContainerId, DropId, ItemId};
use crate::item_type::ItemTypeRef;
use crate::key::ItemKey;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where an item currently lives.
///
/// Exactly one variant holds at any time; moving between them is a single
/// assignment, so container and drop data are never populated together.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemLocation {
    /// Detached: in flight between two locations.
    #[default]
    Unbound,
    /// Stored in a container slot.
    InContainer {
        /// Owning container.
        container: ContainerId,
        /// Slot index inside the container.
        slot: usize,
    },
    /// Lying in the world as a pooled drop.
    InDrop {
        /// Drop holding the item.
        drop: DropId,
        /// Resting position of the drop.
        position: Vec3,
    },
}

impl ItemLocation {
    /// True while the item is detached.
    pub fn is_unbound(&self) -> bool {
        matches!(self, ItemLocation::Unbound)
    }

    /// Container slot, if stored in a container.
    pub fn container_slot(&self) -> Option<(ContainerId, usize)> {
        match *self {
            ItemLocation::InContainer { container, slot } => Some((container, slot)),
            _ => None,
        }
    }

    /// Drop id, if lying in the world.
    pub fn drop_id(&self) -> Option<DropId> {
        match *self {
            ItemLocation::InDrop { drop, .. } => Some(drop),
            _ => None,
        }
    }
}

/// A stack of one item type with a unique identity.
///
/// Items are deliberately not `Clone`: a duplicate would be a second physical
/// copy of the same stack. Use [`Item::split_off`] to create a new instance.
#[derive(Debug)]
pub struct Item {
    id: ItemId,
    item_type: ItemTypeRef,
    stack: u32,
    location: ItemLocation,
}

impl Item {
    /// Create an unbound item; `stack` is clamped to the type's limit.
    pub fn new(item_type: ItemTypeRef, stack: u32) -> Self {
        let stack = stack.min(item_type.max_stack());
        Self {
            id: ItemId::next(),
            item_type,
            stack,
            location: ItemLocation::Unbound,
        }
    }

    /// Unique identity.
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Shared type descriptor.
    pub fn item_type(&self) -> &ItemTypeRef {
        &self.item_type
    }

    /// Registry key of the type.
    pub fn key(&self) -> &ItemKey {
        &self.item_type.key
    }

    /// Current stack count.
    pub fn stack(&self) -> u32 {
        self.stack
    }

    /// Stack limit of the type.
    pub fn max_stack(&self) -> u32 {
        self.item_type.max_stack()
    }

    /// Room left before the stack is full.
    pub fn space(&self) -> u32 {
        self.max_stack().saturating_sub(self.stack)
    }

    /// Whether the stack is at its limit.
    pub fn is_full(&self) -> bool {
        self.stack >= self.max_stack()
    }

    /// A zero stack is logically destroyed and must leave its holder.
    pub fn is_empty(&self) -> bool {
        self.stack == 0
    }

    /// Whether both items share a type and could merge.
    pub fn same_type(&self, other: &Item) -> bool {
        Arc::ptr_eq(&self.item_type, &other.item_type) || self.item_type.key == other.item_type.key
    }

    /// Current location.
    pub fn location(&self) -> ItemLocation {
        self.location
    }

    /// Add `amount`, clamping to the type limit.
    ///
    /// Returns the carry: the part of `amount` that did not fit.
    pub fn increase_stack(&mut self, amount: u32) -> u32 {
        let added = amount.min(self.space());
        self.stack += added;
        amount - added
    }

    /// Remove `amount`, flooring at zero.
    ///
    /// Returns how much of `amount` could not be removed.
    pub fn decrease_stack(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.stack);
        self.stack -= removed;
        amount - removed
    }

    /// Overwrite the stack, clamped to the type limit.
    pub fn set_stack(&mut self, value: u32) {
        self.stack = value.min(self.max_stack());
    }

    /// Move `amount` into a new unbound item of the same type.
    ///
    /// Returns `None` unless `0 < amount < stack`; a whole-stack move keeps
    /// the existing item instead.
    pub fn split_off(&mut self, amount: u32) -> Option<Item> {
        if amount == 0 || amount >= self.stack {
            return None;
        }
        self.stack -= amount;
        let mut copy = Item::new(Arc::clone(&self.item_type), 0);
        copy.set_stack(amount);
        Some(copy)
    }

    /// Rebind into a container slot.
    pub fn move_to_container(&mut self, container: ContainerId, slot: usize) {
        self.location = ItemLocation::InContainer { container, slot };
    }

    /// Rebind into a world drop.
    pub fn move_to_drop(&mut self, drop: DropId, position: Vec3) {
        self.location = ItemLocation::InDrop { drop, position };
    }

    /// Detach from any location.
    pub fn unbind(&mut self) {
        self.location = ItemLocation::Unbound;
    }

    /// Serializable view of this item.
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            id: self.id,
            item_type: self.item_type.key.clone(),
            stack: self.stack,
            location: self.location,
        }
    }
}

/// Plain-data view of an item, used for logs and state dumps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Item identity.
    pub id: ItemId,
    /// Type key.
    pub item_type: ItemKey,
    /// Stack count.
    pub stack: u32,
    /// Location at snapshot time.
    pub location: ItemLocation,
}
