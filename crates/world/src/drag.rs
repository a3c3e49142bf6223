//! Two-phase drag of a stack out of a container slot.
//!
//! `begin` detaches the stack (or half of it) from its slot; exactly one of
//! the commit variants or `cancel` later settles it. While a whole stack is
//! in flight its origin slot stays reserved, so nothing else can claim it and
//! a cancel always has somewhere to go.

use glam::Vec3;
use stowaway_core::{ContainerId, DropId, Item, ItemId};
use tracing::{debug, warn};

use crate::container::{Container, SlotPlacement};
use crate::error::TransferError;
use crate::transfer::{check_origin, TransferCoordinator};

/// How much of the stack a drag picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// The whole stack.
    Whole,
    /// `floor(stack / 2)`; the rest stays in the slot.
    Half,
}

/// The detached stack of an in-flight drag.
#[derive(Debug)]
pub struct DraggedItem {
    item: Item,
    origin: ContainerId,
    slot: usize,
    mode: DragMode,
}

impl DraggedItem {
    /// The detached item.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Container the drag started from.
    pub fn origin(&self) -> ContainerId {
        self.origin
    }

    /// Slot the drag started from.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Drag mode.
    pub fn mode(&self) -> DragMode {
        self.mode
    }
}

/// How a drag was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Landed in an empty slot.
    Placed,
    /// Merged into a same-type stack; any overflow went back to the origin.
    Merged {
        /// Stack absorbed by the target.
        absorbed: u32,
    },
    /// Traded places with a different-type stack.
    Swapped,
    /// Went back to its origin slot.
    Restored,
    /// The target refused; the stack went back to its origin.
    Rejected {
        /// Why the target refused.
        reason: TransferError,
    },
    /// Left the container as a world drop.
    Dropped {
        /// The new drop.
        drop: DropId,
    },
    /// The origin had no room left for the returning stack; the drag is
    /// still in flight and must be committed elsewhere.
    StillDragging,
}

/// Drag state of one UI context. At most one drag is in flight at a time.
#[derive(Debug, Default)]
pub struct DragSession {
    dragged: Option<DraggedItem>,
}

impl DragSession {
    /// Idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag is in flight.
    pub fn is_dragging(&self) -> bool {
        self.dragged.is_some()
    }

    /// The in-flight stack.
    pub fn dragged(&self) -> Option<&DraggedItem> {
        self.dragged.as_ref()
    }

    /// Detach a stack from `slot` and start dragging it.
    pub fn begin(
        &mut self,
        container: &mut Container,
        slot: usize,
        mode: DragMode,
    ) -> Result<ItemId, TransferError> {
        if self.dragged.is_some() {
            return Err(TransferError::DragInProgress);
        }

        let item = match mode {
            DragMode::Whole => {
                let item = container.take(slot, u32::MAX)?;
                container.reserve_slot(slot);
                item
            }
            DragMode::Half => container.split_item(slot)?,
        };
        let id = item.id();
        debug!(container = %container.id(), slot, item = %id, stack = item.stack(), ?mode, "drag started");
        self.dragged = Some(DraggedItem {
            item,
            origin: container.id(),
            slot,
            mode,
        });
        Ok(id)
    }

    /// Release over `slot` of the origin container.
    pub fn commit_within(
        &mut self,
        container: &mut Container,
        slot: usize,
    ) -> Result<DragOutcome, TransferError> {
        let dragged = self.take_for(container.id())?;
        if slot == dragged.slot {
            return Ok(self.settle(
                container,
                dragged.slot,
                dragged.mode,
                Some(dragged.item),
                DragOutcome::Restored,
            ));
        }
        let whole = dragged.mode == DragMode::Whole;
        let placement = container.place(dragged.item, slot, whole);
        Ok(self.apply(container, dragged.slot, dragged.mode, placement))
    }

    /// Release over `slot` of another container.
    pub fn commit_to(
        &mut self,
        source: &mut Container,
        target: &mut Container,
        slot: usize,
    ) -> Result<DragOutcome, TransferError> {
        let dragged = self.take_for(source.id())?;
        let whole = dragged.mode == DragMode::Whole;
        let placement = target.place(dragged.item, slot, whole);
        Ok(self.apply(source, dragged.slot, dragged.mode, placement))
    }

    /// Release outside any container: the stack becomes a world drop near `origin`.
    pub fn commit_to_world(
        &mut self,
        source: &mut Container,
        coordinator: &mut TransferCoordinator,
        origin: Vec3,
    ) -> Result<DragOutcome, TransferError> {
        check_origin(origin)?;
        let dragged = self.take_for(source.id())?;
        source.restore_slot(dragged.slot, None);
        let drop = coordinator.drop_detached(dragged.item, origin, true)?;
        Ok(DragOutcome::Dropped { drop })
    }

    /// Abort the drag, putting the stack back where it came from.
    pub fn cancel(&mut self, source: &mut Container) -> Result<DragOutcome, TransferError> {
        let dragged = self.take_for(source.id())?;
        Ok(self.settle(
            source,
            dragged.slot,
            dragged.mode,
            Some(dragged.item),
            DragOutcome::Restored,
        ))
    }

    fn take_for(&mut self, container: ContainerId) -> Result<DraggedItem, TransferError> {
        match &self.dragged {
            None => return Err(TransferError::NoDragInProgress),
            Some(dragged) if dragged.origin != container => {
                return Err(TransferError::ContainerMismatch {
                    expected: dragged.origin,
                    actual: container,
                })
            }
            Some(_) => {}
        }
        self.dragged.take().ok_or(TransferError::NoDragInProgress)
    }

    fn apply(
        &mut self,
        source: &mut Container,
        slot: usize,
        mode: DragMode,
        placement: SlotPlacement,
    ) -> DragOutcome {
        let (outcome, back) = match placement {
            SlotPlacement::Placed => (DragOutcome::Placed, None),
            SlotPlacement::Merged { absorbed, leftover } => {
                (DragOutcome::Merged { absorbed }, leftover)
            }
            SlotPlacement::Swapped { displaced } => (DragOutcome::Swapped, Some(displaced)),
            SlotPlacement::Rejected { item, reason } => {
                debug!(%reason, "drag target refused the stack");
                (DragOutcome::Rejected { reason }, Some(item))
            }
        };
        self.settle(source, slot, mode, back, outcome)
    }

    fn settle(
        &mut self,
        source: &mut Container,
        slot: usize,
        mode: DragMode,
        back: Option<Item>,
        outcome: DragOutcome,
    ) -> DragOutcome {
        match source.restore_slot(slot, back) {
            None => outcome,
            Some(item) => {
                warn!(container = %source.id(), slot, item = %item.id(), "origin is full, stack stays in flight");
                self.dragged = Some(DraggedItem {
                    item,
                    origin: source.id(),
                    slot,
                    mode,
                });
                DragOutcome::StillDragging
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drop_item::DropPool;
    use crate::ground::NoGround;
    use crate::transfer::TransferConfig;
    use std::sync::Arc;
    use stowaway_core::{ItemKey, ItemType, ItemTypeRef};

    fn item_type(key: &str, max: u32) -> ItemTypeRef {
        Arc::new(ItemType::new(ItemKey::parse(key).unwrap(), key, max))
    }

    fn filled(slots: usize, entries: &[(usize, &ItemTypeRef, u32)]) -> Container {
        let mut container = Container::new("bag", slots);
        for (slot, item_type, stack) in entries {
            let placement = container.add_item_to_slot(Item::new(Arc::clone(item_type), *stack), *slot);
            assert!(matches!(placement, SlotPlacement::Placed));
        }
        container
    }

    #[test]
    fn test_cancel_returns_stack_to_origin_slot() {
        let wood = item_type("wood", 10);
        let mut container = filled(5, &[(1, &wood, 4), (3, &wood, 7)]);
        let before = container.snapshot();
        let mut session = DragSession::new();

        let id = session.begin(&mut container, 3, DragMode::Whole).unwrap();
        assert!(container.get_item_in_slot(3).is_none());
        assert!(container.is_reserved(3));
        assert_eq!(session.dragged().unwrap().item().id(), id);

        assert_eq!(session.cancel(&mut container), Ok(DragOutcome::Restored));
        assert!(!session.is_dragging());
        assert_eq!(container.snapshot(), before);
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_reserved_origin_is_skipped_by_first_fit() {
        let wood = item_type("wood", 10);
        let gem = item_type("gem", 1);
        let mut container = filled(2, &[(0, &wood, 5)]);
        let mut session = DragSession::new();
        session.begin(&mut container, 0, DragMode::Whole).unwrap();

        assert!(container.add_item(Item::new(gem.clone(), 1)).is_none());
        assert_eq!(container.get_item_in_slot(1).unwrap().key(), &gem.key);
        assert!(container.add_item(Item::new(gem, 1)).is_some());

        assert_eq!(session.cancel(&mut container), Ok(DragOutcome::Restored));
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 5);
    }

    #[test]
    fn test_half_drag_cancel_merges_back() {
        let wood = item_type("wood", 10);
        let mut container = filled(2, &[(0, &wood, 7)]);
        let mut session = DragSession::new();

        session.begin(&mut container, 0, DragMode::Half).unwrap();
        assert_eq!(session.dragged().unwrap().item().stack(), 3);
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 4);

        session.cancel(&mut container).unwrap();
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 7);
        assert_eq!(container.occupied_slots(), 1);
    }

    #[test]
    fn test_whole_drag_swaps_and_half_drag_is_ambiguous() {
        let wood = item_type("wood", 10);
        let stone = item_type("stone", 10);
        let mut container = filled(3, &[(0, &wood, 6), (1, &stone, 2)]);
        let mut session = DragSession::new();

        session.begin(&mut container, 0, DragMode::Half).unwrap();
        assert_eq!(
            session.commit_within(&mut container, 1),
            Ok(DragOutcome::Rejected {
                reason: TransferError::AmbiguousTransfer(1)
            })
        );
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 6);

        session.begin(&mut container, 0, DragMode::Whole).unwrap();
        assert_eq!(session.commit_within(&mut container, 1), Ok(DragOutcome::Swapped));
        assert_eq!(container.get_item_in_slot(0).unwrap().key(), &stone.key);
        assert_eq!(container.get_item_in_slot(1).unwrap().key(), &wood.key);
        container.check_invariants().unwrap();
    }

    #[test]
    fn test_merge_overflow_returns_to_origin() {
        let wood = item_type("wood", 10);
        let mut container = filled(3, &[(0, &wood, 8), (2, &wood, 6)]);
        let mut session = DragSession::new();

        session.begin(&mut container, 2, DragMode::Whole).unwrap();
        assert_eq!(
            session.commit_within(&mut container, 0),
            Ok(DragOutcome::Merged { absorbed: 2 })
        );
        assert_eq!(container.get_item_in_slot(0).unwrap().stack(), 10);
        assert_eq!(container.get_item_in_slot(2).unwrap().stack(), 4);

        session.begin(&mut container, 2, DragMode::Whole).unwrap();
        assert_eq!(
            session.commit_within(&mut container, 0),
            Ok(DragOutcome::Rejected {
                reason: TransferError::SlotFull(0)
            })
        );
        assert_eq!(container.get_item_in_slot(2).unwrap().stack(), 4);
    }

    #[test]
    fn test_commit_to_other_container_and_world() {
        let wood = item_type("wood", 10);
        let mut inventory = filled(2, &[(0, &wood, 6), (1, &wood, 3)]);
        let mut chest = Container::new("chest", 2);
        let mut coordinator =
            TransferCoordinator::new(TransferConfig::default(), DropPool::default(), Box::new(NoGround));
        let mut session = DragSession::new();

        session.begin(&mut inventory, 0, DragMode::Whole).unwrap();
        assert_eq!(session.commit_to(&mut inventory, &mut chest, 1), Ok(DragOutcome::Placed));
        assert_eq!(chest.get_item_in_slot(1).unwrap().stack(), 6);
        assert!(!inventory.is_reserved(0));

        session.begin(&mut inventory, 1, DragMode::Whole).unwrap();
        let outcome = session
            .commit_to_world(&mut inventory, &mut coordinator, Vec3::ZERO)
            .unwrap();
        let DragOutcome::Dropped { drop } = outcome else {
            panic!("expected a drop, got {outcome:?}");
        };
        assert_eq!(coordinator.pool().get_active(drop).unwrap().item().unwrap().stack(), 3);
        assert_eq!(inventory.occupied_slots(), 0);
        assert_eq!(inventory.get_available_slot_id(), Some(0));
    }

    #[test]
    fn test_world_commit_at_non_finite_origin_keeps_drag() {
        let wood = item_type("wood", 10);
        let mut inventory = filled(2, &[(0, &wood, 6)]);
        let mut coordinator =
            TransferCoordinator::new(TransferConfig::default(), DropPool::default(), Box::new(NoGround));
        let mut session = DragSession::new();

        session.begin(&mut inventory, 0, DragMode::Whole).unwrap();
        assert_eq!(
            session.commit_to_world(&mut inventory, &mut coordinator, Vec3::splat(f32::NAN)),
            Err(TransferError::NonFinitePosition)
        );
        assert!(session.is_dragging());
        assert!(inventory.is_reserved(0));
        assert_eq!(coordinator.pool().stats().active, 0);

        assert_eq!(session.cancel(&mut inventory), Ok(DragOutcome::Restored));
        assert_eq!(inventory.get_item_in_slot(0).unwrap().stack(), 6);
    }

    #[test]
    fn test_guards_reject_misuse() {
        let wood = item_type("wood", 10);
        let mut container = filled(2, &[(0, &wood, 6)]);
        let mut other = Container::new("other", 2);
        let mut session = DragSession::new();

        assert_eq!(session.cancel(&mut container), Err(TransferError::NoDragInProgress));
        assert_eq!(
            session.begin(&mut container, 1, DragMode::Whole),
            Err(TransferError::EmptySlot(1))
        );
        assert!(!session.is_dragging());

        session.begin(&mut container, 0, DragMode::Whole).unwrap();
        assert_eq!(
            session.begin(&mut container, 0, DragMode::Whole),
            Err(TransferError::DragInProgress)
        );
        assert_eq!(
            session.cancel(&mut other),
            Err(TransferError::ContainerMismatch {
                expected: container.id(),
                actual: other.id()
            })
        );
        assert!(session.is_dragging());
        assert_eq!(session.cancel(&mut container), Ok(DragOutcome::Restored));
    }
}
