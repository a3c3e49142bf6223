//! Soft failures of item transfers.
//!
//! Every variant means the requested operation did nothing: state is left as
//! it was before the call and the caller decides how to recover.

use stowaway_core::{ContainerId, DropId};
use thiserror::Error;

/// Why a transfer was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Slot index outside `0..slot_count`.
    #[error("slot {slot} is outside 0..{slot_count}")]
    InvalidSlotIndex {
        /// Requested slot.
        slot: usize,
        /// Container capacity.
        slot_count: usize,
    },
    /// The source slot holds nothing.
    #[error("slot {0} is empty")]
    EmptySlot(usize),
    /// Destination holds the same type at its stack limit.
    #[error("slot {0} already holds a full stack")]
    SlotFull(usize),
    /// Destination is held open for an in-flight drag.
    #[error("slot {0} is reserved by an in-flight drag")]
    SlotReserved(usize),
    /// Different types with a partial amount: neither merge nor swap applies.
    #[error("cannot move a partial stack onto a different item type in slot {0}")]
    AmbiguousTransfer(usize),
    /// A move of zero items was requested.
    #[error("transfer amount must be greater than zero")]
    ZeroAmount,
    /// A world position with a NaN or infinite component.
    #[error("world position is not finite")]
    NonFinitePosition,
    /// The drop is not active in the pool.
    #[error("{0} is not an active drop")]
    UnknownDrop(DropId),
    /// A drag is already in flight in this context.
    #[error("a drag is already in progress")]
    DragInProgress,
    /// Commit or cancel without a drag.
    #[error("no drag is in progress")]
    NoDragInProgress,
    /// The container passed in is not the drag's origin.
    #[error("expected origin {expected}, got {actual}")]
    ContainerMismatch {
        /// Origin of the drag.
        expected: ContainerId,
        /// Container that was supplied.
        actual: ContainerId,
    },
}
