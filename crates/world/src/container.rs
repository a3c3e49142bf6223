//! Slot containers for player inventories and world chests.
//!
//! A container is the single source of truth for which item sits in which
//! slot: items only change slots through the methods here, and every item
//! stored in slot `s` reports `InContainer { container, slot: s }`.
//!
//! Scans are linear and in slot order, so ties always go to the lowest slot.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use stowaway_core::{ContainerId, Item, ItemId, ItemKey, ItemLocation, ItemSnapshot};
use tracing::{debug, warn};

use crate::error::TransferError;
use crate::events::ContainerListener;

/// Number of slots in the player inventory.
pub const INVENTORY_SLOT_COUNT: usize = 40;

/// Result of placing a detached item into a specific slot.
#[derive(Debug)]
pub enum SlotPlacement {
    /// The slot was empty and now holds the item.
    Placed,
    /// The item merged into a same-type stack; any overflow is handed back.
    Merged {
        /// Stack absorbed by the slot.
        absorbed: u32,
        /// Remainder that did not fit.
        leftover: Option<Item>,
    },
    /// A different-type item was displaced to make room.
    Swapped {
        /// The previous occupant, now unbound.
        displaced: Item,
    },
    /// Nothing changed; the item is handed back.
    Rejected {
        /// The untouched item.
        item: Item,
        /// Why it was refused.
        reason: TransferError,
    },
}

/// What a targeted move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Source and destination were the same item.
    Unchanged,
    /// The whole stack moved into an empty slot.
    Relocated,
    /// Part of the stack moved into an empty slot as a new item.
    Split {
        /// Identity of the new item.
        item: ItemId,
    },
    /// Stack merged into a same-type item.
    Merged {
        /// Stack moved.
        absorbed: u32,
    },
    /// Two different-type stacks traded slots.
    Swapped,
}

#[derive(Debug, Clone, Copy)]
enum MoveKind {
    Unchanged,
    Relocate,
    Split,
    Merge { absorbed: u32 },
    Swap,
}

enum PlaceStep {
    Insert,
    Merged(u32),
    Swap,
    Refuse(TransferError),
}

#[derive(Debug, Clone, Copy)]
enum SlotEvent {
    Added,
    Changed,
    Removed,
}

/// Plain-data view of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Container identity.
    pub id: ContainerId,
    /// Display name.
    pub name: String,
    /// Fixed capacity.
    pub slot_count: usize,
    /// Occupied slots in slot order.
    pub items: Vec<ItemSnapshot>,
}

/// Fixed-capacity, slot-indexed item storage.
pub struct Container {
    id: ContainerId,
    name: String,
    slots: Vec<Option<Item>>,
    reserved: BTreeSet<usize>,
    listeners: Vec<Rc<dyn ContainerListener>>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("reserved", &self.reserved)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Container {
    /// Create an empty container; the capacity never changes afterwards.
    pub fn new(name: impl Into<String>, slot_count: usize) -> Self {
        Self {
            id: ContainerId::next(),
            name: name.into(),
            slots: std::iter::repeat_with(|| None).take(slot_count).collect(),
            reserved: BTreeSet::new(),
            listeners: Vec::new(),
        }
    }

    /// Container identity.
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed capacity.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Register a listener; it sees every later notification.
    pub fn subscribe(&mut self, listener: Rc<dyn ContainerListener>) {
        self.listeners.push(listener);
    }

    /// Item stored in `slot`, if any.
    pub fn get_item_in_slot(&self, slot: usize) -> Option<&Item> {
        self.slots.get(slot)?.as_ref()
    }

    /// Occupied slots in slot order.
    pub fn items(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, item)| item.as_ref().map(|item| (slot, item)))
    }

    /// Number of occupied slots.
    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Slot holding the item with `id`.
    pub fn slot_of(&self, id: ItemId) -> Option<usize> {
        self.items()
            .find(|(_, item)| item.id() == id)
            .map(|(slot, _)| slot)
    }

    /// Total stack of one type across all slots.
    pub fn count_of(&self, key: &ItemKey) -> u32 {
        self.items()
            .filter(|(_, item)| item.key() == key)
            .map(|(_, item)| item.stack())
            .sum()
    }

    /// Whether `slot` is held open for an in-flight drag.
    pub fn is_reserved(&self, slot: usize) -> bool {
        self.reserved.contains(&slot)
    }

    /// First empty, unreserved slot.
    pub fn get_available_slot_id(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .position(|(slot, item)| item.is_none() && !self.reserved.contains(&slot))
    }

    /// No slot can be granted and no stack can grow.
    pub fn is_container_full(&self) -> bool {
        self.get_available_slot_id().is_none() && self.items().all(|(_, item)| item.is_full())
    }

    /// Merge `item` into existing stacks, then place the rest in the first free slot.
    ///
    /// Same-type stacks that are not full absorb the item first, lowest slot
    /// first. Returns whatever could not be placed.
    pub fn add_item(&mut self, mut item: Item) -> Option<Item> {
        if item.is_empty() {
            return None;
        }

        while let Some(slot) = self.mergeable_slot(&item) {
            let absorbed = match self.slots[slot].as_mut() {
                Some(existing) => item.stack() - existing.increase_stack(item.stack()),
                None => break,
            };
            item.decrease_stack(absorbed);
            self.emit_slot(SlotEvent::Changed, slot);
            if item.is_empty() {
                return None;
            }
        }

        match self.get_available_slot_id() {
            Some(slot) => {
                self.insert(slot, item);
                None
            }
            None => {
                debug!(container = %self.id, leftover = item.stack(), "container cannot take the rest of the stack");
                Some(item)
            }
        }
    }

    /// Place a detached item into `slot`, swapping out a different type if needed.
    pub fn add_item_to_slot(&mut self, item: Item, slot: usize) -> SlotPlacement {
        self.place(item, slot, true)
    }

    /// Move `amount` from slot `from` to slot `to` of this container.
    ///
    /// Same item: nothing happens. Empty destination: relocate (whole stack)
    /// or split (partial). Same type: merge what fits, or [`TransferError::SlotFull`].
    /// Different type: swap (whole stack) or [`TransferError::AmbiguousTransfer`].
    /// Any error leaves both slots untouched.
    pub fn move_item_to_slot(
        &mut self,
        from: usize,
        to: usize,
        amount: u32,
    ) -> Result<MoveOutcome, TransferError> {
        transfer(self, None, from, to, amount)
    }

    /// Like [`Container::move_item_to_slot`], with the destination slot in `dst`.
    pub fn move_item_to(
        &mut self,
        dst: &mut Container,
        from: usize,
        to: usize,
        amount: u32,
    ) -> Result<MoveOutcome, TransferError> {
        transfer(self, Some(dst), from, to, amount)
    }

    /// Decrease the stack in `slot`, freeing the slot when it reaches zero.
    ///
    /// Returns the part of `amount` that exceeded the stack.
    pub fn remove_item(&mut self, slot: usize, amount: u32) -> Result<u32, TransferError> {
        self.check_slot(slot)?;
        let (unsatisfied, emptied) = match self.slots[slot].as_mut() {
            Some(item) => {
                let unsatisfied = item.decrease_stack(amount);
                (unsatisfied, item.is_empty())
            }
            None => return Err(TransferError::EmptySlot(slot)),
        };

        if emptied {
            if let Some(mut item) = self.slots[slot].take() {
                item.unbind();
                self.emit(SlotEvent::Removed, slot, &item);
            }
        } else {
            self.emit_slot(SlotEvent::Changed, slot);
        }
        Ok(unsatisfied)
    }

    /// Detach `amount` from `slot` as an unbound item.
    ///
    /// The whole stack leaves as the same item; a partial amount leaves as a
    /// new item while the original shrinks in place.
    pub fn take(&mut self, slot: usize, amount: u32) -> Result<Item, TransferError> {
        self.check_slot(slot)?;
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }
        let stack = match self.slots[slot].as_ref() {
            Some(item) => item.stack(),
            None => return Err(TransferError::EmptySlot(slot)),
        };

        if amount >= stack {
            let mut item = self.slots[slot]
                .take()
                .ok_or(TransferError::EmptySlot(slot))?;
            item.unbind();
            self.emit(SlotEvent::Removed, slot, &item);
            return Ok(item);
        }

        let copy = self.slots[slot]
            .as_mut()
            .and_then(|item| item.split_off(amount))
            .ok_or(TransferError::EmptySlot(slot))?;
        self.emit_slot(SlotEvent::Changed, slot);
        Ok(copy)
    }

    /// Split off `floor(stack / 2)` as a new unbound item.
    pub fn split_item(&mut self, slot: usize) -> Result<Item, TransferError> {
        self.check_slot(slot)?;
        let half = match self.slots[slot].as_ref() {
            Some(item) => item.stack() / 2,
            None => return Err(TransferError::EmptySlot(slot)),
        };
        if half == 0 {
            return Err(TransferError::ZeroAmount);
        }
        self.take(slot, half)
    }

    /// Return a detached item (or nothing) to the slot it came from.
    ///
    /// Clears any reservation on `slot`. The item goes back into the slot if
    /// it is empty or holds the same type; what does not fit there is added
    /// first-fit. Anything still left over is handed back to the caller.
    pub fn restore_slot(&mut self, slot: usize, item: Option<Item>) -> Option<Item> {
        self.reserved.remove(&slot);
        let item = item?;
        let rest = match self.place(item, slot, false) {
            SlotPlacement::Placed => None,
            SlotPlacement::Merged { leftover, .. } => leftover,
            SlotPlacement::Swapped { displaced } => Some(displaced),
            SlotPlacement::Rejected { item, reason } => {
                debug!(container = %self.id, slot, %reason, "origin slot unavailable, adding first-fit");
                Some(item)
            }
        };
        let rest = rest.and_then(|rest| self.add_item(rest));
        if let Some(item) = &rest {
            warn!(container = %self.id, slot, stack = item.stack(), "item could not be restored to its container");
        }
        rest
    }

    /// Hold an empty slot open so first-fit placement skips it.
    pub(crate) fn reserve_slot(&mut self, slot: usize) {
        if matches!(self.slots.get(slot), Some(None)) {
            self.reserved.insert(slot);
        }
    }

    /// Serializable view of the container.
    pub fn snapshot(&self) -> ContainerSnapshot {
        ContainerSnapshot {
            id: self.id,
            name: self.name.clone(),
            slot_count: self.slot_count(),
            items: self.items().map(|(_, item)| item.snapshot()).collect(),
        }
    }

    /// Verify slot bookkeeping; returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        for (slot, item) in self.items() {
            let expected = ItemLocation::InContainer {
                container: self.id,
                slot,
            };
            if item.location() != expected {
                return Err(format!(
                    "{} in slot {slot} reports location {:?}",
                    item.id(),
                    item.location()
                ));
            }
            if item.is_empty() || item.stack() > item.max_stack() {
                return Err(format!(
                    "{} in slot {slot} has stack {}",
                    item.id(),
                    item.stack()
                ));
            }
            if !seen.insert(item.id()) {
                return Err(format!("{} occupies more than one slot", item.id()));
            }
        }
        if let Some(slot) = self
            .reserved
            .iter()
            .find(|slot| self.get_item_in_slot(**slot).is_some())
        {
            return Err(format!("reserved slot {slot} is occupied"));
        }
        Ok(())
    }

    fn mergeable_slot(&self, item: &Item) -> Option<usize> {
        self.items()
            .find(|(_, existing)| existing.same_type(item) && !existing.is_full())
            .map(|(slot, _)| slot)
    }

    fn check_slot(&self, slot: usize) -> Result<(), TransferError> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            warn!(container = %self.id, slot, slot_count = self.slots.len(), "invalid slot index");
            Err(TransferError::InvalidSlotIndex {
                slot,
                slot_count: self.slots.len(),
            })
        }
    }

    fn insert(&mut self, slot: usize, mut item: Item) {
        item.move_to_container(self.id, slot);
        self.slots[slot] = Some(item);
        self.emit_slot(SlotEvent::Added, slot);
    }

    pub(crate) fn place(&mut self, mut item: Item, slot: usize, allow_swap: bool) -> SlotPlacement {
        if let Err(reason) = self.check_slot(slot) {
            return SlotPlacement::Rejected { item, reason };
        }
        if self.reserved.contains(&slot) {
            return SlotPlacement::Rejected {
                item,
                reason: TransferError::SlotReserved(slot),
            };
        }
        if item.is_empty() {
            return SlotPlacement::Rejected {
                item,
                reason: TransferError::ZeroAmount,
            };
        }

        let step = match self.slots[slot].as_mut() {
            None => PlaceStep::Insert,
            Some(existing) if existing.same_type(&item) => {
                if existing.is_full() {
                    PlaceStep::Refuse(TransferError::SlotFull(slot))
                } else {
                    let carry = existing.increase_stack(item.stack());
                    PlaceStep::Merged(item.stack() - carry)
                }
            }
            Some(_) if allow_swap => PlaceStep::Swap,
            Some(_) => PlaceStep::Refuse(TransferError::AmbiguousTransfer(slot)),
        };

        match step {
            PlaceStep::Insert => {
                self.insert(slot, item);
                SlotPlacement::Placed
            }
            PlaceStep::Refuse(reason) => SlotPlacement::Rejected { item, reason },
            PlaceStep::Swap => {
                item.move_to_container(self.id, slot);
                match self.slots[slot].replace(item) {
                    Some(mut displaced) => {
                        displaced.unbind();
                        self.emit(SlotEvent::Removed, slot, &displaced);
                        self.emit_slot(SlotEvent::Added, slot);
                        SlotPlacement::Swapped { displaced }
                    }
                    None => {
                        self.emit_slot(SlotEvent::Added, slot);
                        SlotPlacement::Placed
                    }
                }
            }
            PlaceStep::Merged(absorbed) => {
                item.decrease_stack(absorbed);
                self.emit_slot(SlotEvent::Changed, slot);
                SlotPlacement::Merged {
                    absorbed,
                    leftover: (!item.is_empty()).then_some(item),
                }
            }
        }
    }

    fn emit_slot(&self, event: SlotEvent, slot: usize) {
        if let Some(item) = self.get_item_in_slot(slot) {
            self.emit(event, slot, item);
        }
    }

    fn emit(&self, event: SlotEvent, slot: usize, item: &Item) {
        for listener in &self.listeners {
            match event {
                SlotEvent::Added => listener.on_item_added(self.id, slot, item),
                SlotEvent::Changed => listener.on_item_changed(self.id, slot, item),
                SlotEvent::Removed => listener.on_item_removed(self.id, slot, item),
            }
        }
    }
}

fn classify(
    source: &Item,
    amount: u32,
    dest: Option<&Item>,
    to: usize,
) -> Result<MoveKind, TransferError> {
    let whole = amount == source.stack();
    match dest {
        None if whole => Ok(MoveKind::Relocate),
        None => Ok(MoveKind::Split),
        Some(existing) if existing.id() == source.id() => Ok(MoveKind::Unchanged),
        Some(existing) if existing.same_type(source) => {
            if existing.is_full() {
                Err(TransferError::SlotFull(to))
            } else {
                Ok(MoveKind::Merge {
                    absorbed: amount.min(existing.space()),
                })
            }
        }
        Some(_) if whole => Ok(MoveKind::Swap),
        Some(_) => Err(TransferError::AmbiguousTransfer(to)),
    }
}

/// Shared body of the targeted moves; `dst == None` means within `src`.
fn transfer(
    src: &mut Container,
    mut dst: Option<&mut Container>,
    from: usize,
    to: usize,
    amount: u32,
) -> Result<MoveOutcome, TransferError> {
    src.check_slot(from)?;
    match dst.as_deref() {
        Some(dst) => dst.check_slot(to)?,
        None => src.check_slot(to)?,
    }
    if amount == 0 {
        return Err(TransferError::ZeroAmount);
    }
    if dst.is_none() && from == to {
        return Ok(MoveOutcome::Unchanged);
    }

    let source = src
        .get_item_in_slot(from)
        .ok_or(TransferError::EmptySlot(from))?;
    let amount = amount.min(source.stack());
    let whole = amount == source.stack();
    let (dest, dest_reserved) = match dst.as_deref() {
        Some(dst) => (dst.get_item_in_slot(to), dst.is_reserved(to)),
        None => (src.get_item_in_slot(to), src.is_reserved(to)),
    };
    if dest_reserved {
        return Err(TransferError::SlotReserved(to));
    }
    let kind = classify(source, amount, dest, to).map_err(|err| {
        debug!(container = %src.id, from, to, amount, %err, "targeted move rejected");
        err
    })?;

    let moving_amount = match kind {
        MoveKind::Unchanged => return Ok(MoveOutcome::Unchanged),
        MoveKind::Merge { absorbed } => absorbed,
        MoveKind::Relocate | MoveKind::Split | MoveKind::Swap => amount,
    };
    let moving = src.take(from, moving_amount)?;
    let moved_id = moving.id();
    let placement = match dst.as_deref_mut() {
        Some(dst) => dst.place(moving, to, whole),
        None => src.place(moving, to, whole),
    };

    // Classification already ruled out every rejection, so whatever comes
    // back fits into `from`: it is either empty or holds the same type.
    let (outcome, back) = match placement {
        SlotPlacement::Placed => match kind {
            MoveKind::Split => (MoveOutcome::Split { item: moved_id }, None),
            _ => (MoveOutcome::Relocated, None),
        },
        SlotPlacement::Merged { absorbed, leftover } => (MoveOutcome::Merged { absorbed }, leftover),
        SlotPlacement::Swapped { displaced } => (MoveOutcome::Swapped, Some(displaced)),
        SlotPlacement::Rejected { item, reason } => {
            warn!(container = %src.id, from, to, %reason, "placement rejected after classification");
            src.restore_slot(from, Some(item));
            return Err(reason);
        }
    };
    src.restore_slot(from, back);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::Arc;
    use stowaway_core::{ItemType, ItemTypeRef};

    fn item_type(key: &str, max: u32) -> ItemTypeRef {
        Arc::new(ItemType::new(ItemKey::parse(key).unwrap(), key, max))
    }

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<(&'static str, usize, u32)>>,
    }

    impl ContainerListener for Recorder {
        fn on_item_added(&self, _: ContainerId, slot: usize, item: &Item) {
            self.events.borrow_mut().push(("added", slot, item.stack()));
        }
        fn on_item_changed(&self, _: ContainerId, slot: usize, item: &Item) {
            self.events.borrow_mut().push(("changed", slot, item.stack()));
        }
        fn on_item_removed(&self, _: ContainerId, slot: usize, item: &Item) {
            self.events.borrow_mut().push(("removed", slot, item.stack()));
        }
    }

    #[test]
    fn test_add_item_merges_then_overflows() {
        let wood = item_type("wood", 10);
        let mut container = Container::new("pouch", 1);

        assert!(container.add_item(Item::new(wood.clone(), 6)).is_none());
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 6);

        let leftover = container.add_item(Item::new(wood, 6)).unwrap();
        assert_eq!(leftover.stack(), 2);
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 10);
        assert!(container.is_container_full());
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_add_item_keeps_types_apart() {
        let mut container = Container::new("bag", 2);
        assert!(container.add_item(Item::new(item_type("a", 10), 4)).is_none());
        assert!(container.add_item(Item::new(item_type("b", 10), 3)).is_none());

        assert_eq!(container.occupied_slots(), 2);
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 4);
        assert_eq!(container.get_item_in_slot(1).unwrap().stack(), 3);
        assert!(!container.is_container_full());
    }

    #[test]
    fn test_add_item_fills_lowest_mergeable_slot_first() {
        let wood = item_type("wood", 10);
        let mut container = Container::new("bag", 4);
        for stack in [7, 9, 4] {
            assert!(container.add_item(Item::new(wood.clone(), stack)).is_none());
        }
        assert_eq!(container.occupied_slots(), 2);
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 10);
        assert_eq!(container.get_item_in_slot(1).unwrap().stack(), 10);

        assert!(container.add_item(Item::new(wood.clone(), 5)).is_none());
        assert_eq!(container.get_item_in_slot(2).unwrap().stack(), 5);
        assert_eq!(container.count_of(&wood.key), 25);
    }

    #[test]
    fn test_placed_item_keeps_identity_and_location() {
        let mut container = Container::new("bag", 3);
        let item = Item::new(item_type("gem", 5), 2);
        let id = item.id();
        container.add_item(item);

        assert_eq!(container.slot_of(id), Some(0));
        let stored = container.get_item_in_slot(0).unwrap();
        assert_eq!(
            stored.location(),
            ItemLocation::InContainer {
                container: container.id(),
                slot: 0
            }
        );
    }

    #[test]
    fn test_move_onto_full_same_type_is_a_no_op() {
        let wood = item_type("wood", 10);
        let mut container = Container::new("bag", 2);
        container.add_item(Item::new(wood.clone(), 10));
        let placement = container.add_item_to_slot(Item::new(wood, 4), 1);
        assert!(matches!(placement, SlotPlacement::Placed));
        let before = container.snapshot();

        let err = container.move_item_to_slot(1, 0, 4).unwrap_err();
        assert_eq!(err, TransferError::SlotFull(0));
        assert_eq!(container.snapshot(), before);
    }

    #[test]
    fn test_move_into_empty_slot_relocates_or_splits() {
        let mut container = Container::new("bag", 3);
        container.add_item(Item::new(item_type("wood", 20), 12));
        let original = container.get_item_in_slot(0).unwrap().id();

        let outcome = container.move_item_to_slot(0, 2, 12).unwrap();
        assert_eq!(outcome, MoveOutcome::Relocated);
        assert!(container.get_item_in_slot(0).is_none());
        assert_eq!(container.get_item_in_slot(2).unwrap().id(), original);

        let outcome = container.move_item_to_slot(2, 1, 5).unwrap();
        let MoveOutcome::Split { item } = outcome else {
            panic!("expected split, got {outcome:?}");
        };
        assert_ne!(item, original);
        assert_eq!(container.get_item_in_slot(1).unwrap().stack(), 5);
        assert_eq!(container.get_item_in_slot(2).unwrap().stack(), 7);
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_move_merges_only_what_fits() {
        let wood = item_type("wood", 10);
        let mut container = Container::new("bag", 3);
        container.add_item_to_slot(Item::new(wood.clone(), 8), 0);
        container.add_item_to_slot(Item::new(wood, 6), 2);

        let outcome = container.move_item_to_slot(2, 0, 6).unwrap();
        assert_eq!(outcome, MoveOutcome::Merged { absorbed: 2 });
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 10);
        assert_eq!(container.get_item_in_slot(2).unwrap().stack(), 4);
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_move_whole_stack_swaps_different_types() {
        let mut container = Container::new("bag", 2);
        container.add_item(Item::new(item_type("a", 10), 3));
        container.add_item(Item::new(item_type("b", 10), 5));
        let a = container.get_item_in_slot(0).unwrap().id();
        let b = container.get_item_in_slot(1).unwrap().id();

        assert_eq!(container.move_item_to_slot(0, 1, 3), Ok(MoveOutcome::Swapped));
        assert_eq!(container.slot_of(a), Some(1));
        assert_eq!(container.slot_of(b), Some(0));
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_partial_move_onto_different_type_is_rejected() {
        let mut container = Container::new("bag", 2);
        container.add_item(Item::new(item_type("a", 10), 6));
        container.add_item(Item::new(item_type("b", 10), 5));
        let before = container.snapshot();

        assert_eq!(
            container.move_item_to_slot(0, 1, 2),
            Err(TransferError::AmbiguousTransfer(1))
        );
        assert_eq!(container.snapshot(), before);
    }

    #[test]
    fn test_move_to_own_slot_and_bad_indices() {
        let mut container = Container::new("bag", 2);
        container.add_item(Item::new(item_type("a", 10), 6));
        assert_eq!(container.move_item_to_slot(0, 0, 6), Ok(MoveOutcome::Unchanged));
        assert!(matches!(
            container.move_item_to_slot(0, 9, 1),
            Err(TransferError::InvalidSlotIndex { slot: 9, .. })
        ));
        assert_eq!(
            container.move_item_to_slot(1, 0, 1),
            Err(TransferError::EmptySlot(1))
        );
        assert_eq!(container.move_item_to_slot(0, 1, 0), Err(TransferError::ZeroAmount));
    }

    #[test]
    fn test_move_across_containers_swaps_into_source_slot() {
        let mut inventory = Container::new("inventory", 2);
        let mut chest = Container::new("chest", 2);
        inventory.add_item(Item::new(item_type("a", 10), 4));
        chest.add_item(Item::new(item_type("b", 10), 2));

        assert_eq!(inventory.move_item_to(&mut chest, 0, 0, 4), Ok(MoveOutcome::Swapped));
        assert_eq!(inventory.get_item_in_slot(0).unwrap().key().path(), "b");
        assert_eq!(chest.get_item_in_slot(0).unwrap().key().path(), "a");
        inventory.check_invariants().unwrap();
        chest.check_invariants().unwrap();

        assert!(matches!(
            inventory.move_item_to(&mut chest, 0, 1, 1),
            Ok(MoveOutcome::Split { .. })
        ));
        assert_eq!(inventory.get_item_in_slot(0).unwrap().stack(), 1);
        assert_eq!(chest.get_item_in_slot(1).unwrap().stack(), 1);
    }

    #[test]
    fn test_move_across_containers_follows_placement_table() {
        let wood = item_type("wood", 10);
        let stone = item_type("stone", 10);
        let gem = item_type("gem", 5);
        let mut inventory = Container::new("inventory", 3);
        let mut chest = Container::new("chest", 3);
        inventory.add_item_to_slot(Item::new(wood.clone(), 6), 0);
        inventory.add_item_to_slot(Item::new(stone, 5), 1);
        inventory.add_item_to_slot(Item::new(wood.clone(), 4), 2);
        chest.add_item_to_slot(Item::new(wood, 8), 0);
        chest.add_item_to_slot(Item::new(gem, 2), 1);

        assert_eq!(
            inventory.move_item_to(&mut chest, 0, 0, 6),
            Ok(MoveOutcome::Merged { absorbed: 2 })
        );
        assert_eq!(inventory.get_item_in_slot(0).unwrap().stack(), 4);
        assert_eq!(chest.get_item_in_slot(0).unwrap().stack(), 10);

        chest.reserve_slot(2);
        let inventory_before = inventory.snapshot();
        let chest_before = chest.snapshot();
        assert_eq!(
            inventory.move_item_to(&mut chest, 0, 0, 4),
            Err(TransferError::SlotFull(0))
        );
        assert_eq!(
            inventory.move_item_to(&mut chest, 1, 1, 2),
            Err(TransferError::AmbiguousTransfer(1))
        );
        assert_eq!(
            inventory.move_item_to(&mut chest, 2, 2, 4),
            Err(TransferError::SlotReserved(2))
        );
        assert_eq!(
            inventory.move_item_to(&mut chest, 0, 3, 1),
            Err(TransferError::InvalidSlotIndex {
                slot: 3,
                slot_count: 3
            })
        );
        assert_eq!(inventory.snapshot(), inventory_before);
        assert_eq!(chest.snapshot(), chest_before);
        inventory.check_invariants().unwrap();
        chest.check_invariants().unwrap();
    }

    #[test]
    fn test_take_full_and_partial() {
        let mut container = Container::new("bag", 1);
        container.add_item(Item::new(item_type("wood", 10), 9));
        let original = container.get_item_in_slot(0).unwrap().id();

        let part = container.take(0, 4).unwrap();
        assert_ne!(part.id(), original);
        assert_eq!(part.stack(), 4);
        assert!(part.location().is_unbound());
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 5);

        let rest = container.take(0, 50).unwrap();
        assert_eq!(rest.id(), original);
        assert!(rest.location().is_unbound());
        assert!(container.get_item_in_slot(0).is_none());
    }

    #[test]
    fn test_split_item_halves_rounding_down() {
        let mut container = Container::new("bag", 1);
        container.add_item(Item::new(item_type("wood", 10), 7));

        let half = container.split_item(0).unwrap();
        assert_eq!(half.stack(), 3);
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 4);

        container.remove_item(0, 3).unwrap();
        assert_eq!(container.split_item(0).unwrap_err(), TransferError::ZeroAmount);
    }

    #[test]
    fn test_remove_item_frees_slot_at_zero() {
        let mut container = Container::new("bag", 1);
        container.add_item(Item::new(item_type("wood", 10), 3));
        assert_eq!(container.remove_item(0, 1), Ok(0));
        assert_eq!(container.remove_item(0, 5), Ok(3));
        assert!(container.get_item_in_slot(0).is_none());
        assert_eq!(container.remove_item(0, 1), Err(TransferError::EmptySlot(0)));
    }

    #[test]
    fn test_reserved_slot_is_skipped_and_restored() {
        let wood = item_type("wood", 10);
        let mut container = Container::new("bag", 2);
        container.add_item(Item::new(item_type("gem", 1), 1));
        let gem = container.take(0, 1).unwrap();
        container.reserve_slot(0);

        assert_eq!(container.get_available_slot_id(), Some(1));
        container.add_item(Item::new(wood.clone(), 3));
        assert_eq!(container.slot_of(gem.id()), None);
        assert!(matches!(
            container.add_item_to_slot(Item::new(wood, 1), 0),
            SlotPlacement::Rejected {
                reason: TransferError::SlotReserved(0),
                ..
            }
        ));

        let gem_id = gem.id();
        assert!(container.restore_slot(0, Some(gem)).is_none());
        assert_eq!(container.slot_of(gem_id), Some(0));
        assert!(!container.is_reserved(0));
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_notifications_follow_slot_mutations() {
        let wood = item_type("wood", 10);
        let recorder = Rc::new(Recorder::default());
        let mut container = Container::new("bag", 2);
        container.subscribe(recorder.clone());

        container.add_item(Item::new(wood.clone(), 6));
        container.add_item(Item::new(wood, 6));
        container.move_item_to_slot(1, 0, 2).unwrap_err();
        container.remove_item(1, 2).unwrap();

        assert_eq!(
            *recorder.events.borrow(),
            vec![
                ("added", 0, 6),
                ("changed", 0, 10),
                ("added", 1, 2),
                ("removed", 1, 0),
            ]
        );
    }
}
