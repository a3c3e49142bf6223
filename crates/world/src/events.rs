//! Change notifications emitted by containers and the transfer coordinator.
//!
//! Listeners are called synchronously, in subscription order, before the
//! mutating call returns. One notification is emitted per slot mutation:
//! `added` when an item enters a slot, `removed` when it leaves one and
//! `changed` when its stack changes in place.

use serde::{Deserialize, Serialize};
use stowaway_core::{ClusterId, ContainerId, DropId, Item, ItemKey};
use tracing::debug;

/// Observer of a single container.
pub trait ContainerListener {
    /// An item entered `slot`.
    fn on_item_added(&self, _container: ContainerId, _slot: usize, _item: &Item) {}

    /// The item in `slot` changed its stack.
    fn on_item_changed(&self, _container: ContainerId, _slot: usize, _item: &Item) {}

    /// An item left `slot`.
    fn on_item_removed(&self, _container: ContainerId, _slot: usize, _item: &Item) {}
}

/// Outcome of one pickup attempt, full or partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupReport {
    /// Drop that was picked from.
    pub drop: DropId,
    /// Cluster the drop belonged to.
    pub cluster: Option<ClusterId>,
    /// Destination container.
    pub container: ContainerId,
    /// Type of the picked item.
    pub item_type: ItemKey,
    /// Stack moved into the container.
    pub absorbed: u32,
    /// Stack still lying on the drop.
    pub remaining: u32,
}

impl PickupReport {
    /// Whether the drop was emptied and returned to the pool.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Global observer of pickups.
pub trait PickupListener {
    /// Called after every pickup attempt on an active drop.
    fn on_item_picked_up(&self, report: &PickupReport);
}

/// Listener that forwards every notification to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ContainerListener for TracingListener {
    fn on_item_added(&self, container: ContainerId, slot: usize, item: &Item) {
        debug!(%container, slot, item = %item.id(), key = %item.key(), stack = item.stack(), "item added");
    }

    fn on_item_changed(&self, container: ContainerId, slot: usize, item: &Item) {
        debug!(%container, slot, item = %item.id(), stack = item.stack(), "item changed");
    }

    fn on_item_removed(&self, container: ContainerId, slot: usize, item: &Item) {
        debug!(%container, slot, item = %item.id(), "item removed");
    }
}

impl PickupListener for TracingListener {
    fn on_item_picked_up(&self, report: &PickupReport) {
        debug!(
            drop = %report.drop,
            container = %report.container,
            absorbed = report.absorbed,
            remaining = report.remaining,
            "item picked up"
        );
    }
}
