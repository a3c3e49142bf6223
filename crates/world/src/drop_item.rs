//! Pooled world drops.
//!
//! A drop is the world-side holder of exactly one item. Drops live in an
//! arena owned by [`DropPool`] and are never freed: releasing one parks its
//! index on a per-type free list so the next drop of that type reuses it
//! without paying for a new visual.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use stowaway_core::{ClusterId, DropId, Item, ItemKey, ItemSnapshot, ItemType, ItemTypeRef};
use tracing::{debug, trace};

use crate::error::TransferError;

/// Opaque handle to whatever presents a drop (mesh, sprite, nothing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// Backing store for drop visuals; only consulted on a pool miss.
pub trait DropVisuals {
    /// Build a visual for a new pooled drop of `item_type`.
    fn instantiate(&mut self, item_type: &ItemType) -> VisualHandle;

    /// Show or hide a pooled visual.
    fn set_active(&mut self, _handle: VisualHandle, _active: bool) {}
}

/// Visuals for headless runs: hands out sequential handles and counts them.
#[derive(Debug, Default, Clone)]
pub struct HeadlessVisuals {
    instantiated: u32,
}

impl HeadlessVisuals {
    /// Number of visuals built so far.
    pub fn instantiated(&self) -> u32 {
        self.instantiated
    }
}

impl DropVisuals for HeadlessVisuals {
    fn instantiate(&mut self, item_type: &ItemType) -> VisualHandle {
        let handle = VisualHandle(self.instantiated);
        self.instantiated += 1;
        trace!(key = %item_type.key, handle = handle.0, "instantiated drop visual");
        handle
    }
}

/// A world-placed holder of one item.
#[derive(Debug)]
pub struct ItemDrop {
    id: DropId,
    item: Option<Item>,
    cluster: Option<ClusterId>,
    position: Vec3,
    item_type: ItemTypeRef,
    visual: VisualHandle,
    active: bool,
}

impl ItemDrop {
    /// Drop identity (its arena index).
    pub fn id(&self) -> DropId {
        self.id
    }

    /// Held item while active.
    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    /// Owning cluster while active.
    pub fn cluster(&self) -> Option<ClusterId> {
        self.cluster
    }

    /// Resting position.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Type this drop was last bound to; decides pool reuse.
    pub fn item_type(&self) -> &ItemTypeRef {
        &self.item_type
    }

    /// Presentation handle.
    pub fn visual(&self) -> VisualHandle {
        self.visual
    }

    /// Whether the drop is in the world rather than parked in the pool.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Serializable view of the drop.
    pub fn snapshot(&self) -> DropSnapshot {
        DropSnapshot {
            id: self.id,
            cluster: self.cluster,
            position: self.position,
            item: self.item.as_ref().map(Item::snapshot),
        }
    }

    pub(crate) fn take_item(&mut self) -> Option<Item> {
        self.item.take()
    }

    pub(crate) fn put_back(&mut self, mut item: Item) {
        item.move_to_drop(self.id, self.position);
        self.item = Some(item);
    }
}

/// Plain-data view of an active drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropSnapshot {
    /// Drop identity.
    pub id: DropId,
    /// Owning cluster.
    pub cluster: Option<ClusterId>,
    /// Resting position.
    pub position: Vec3,
    /// Held item.
    pub item: Option<ItemSnapshot>,
}

/// Pool occupancy counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Drops ever created.
    pub total: usize,
    /// Drops currently in the world.
    pub active: usize,
    /// Drops parked on a free list.
    pub idle: usize,
    /// Visuals instantiated (one per pool miss).
    pub instantiated: usize,
}

/// Arena of drops with per-type free lists.
pub struct DropPool {
    drops: Vec<ItemDrop>,
    idle: HashMap<ItemKey, Vec<DropId>>,
    visuals: Box<dyn DropVisuals>,
    instantiated: usize,
}

impl std::fmt::Debug for DropPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropPool")
            .field("drops", &self.drops.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for DropPool {
    fn default() -> Self {
        Self::new(Box::new(HeadlessVisuals::default()))
    }
}

impl DropPool {
    /// Create an empty pool drawing visuals from `visuals`.
    pub fn new(visuals: Box<dyn DropVisuals>) -> Self {
        Self {
            drops: Vec::new(),
            idle: HashMap::new(),
            visuals,
            instantiated: 0,
        }
    }

    /// Get an idle drop last bound to `item_type`, or build a new one.
    ///
    /// The returned drop is reserved for the caller but stays inactive
    /// until [`DropPool::bind`].
    pub fn acquire(&mut self, item_type: &ItemTypeRef) -> DropId {
        if let Some(id) = self
            .idle
            .get_mut(&item_type.key)
            .and_then(|free| free.pop())
        {
            trace!(drop = %id, key = %item_type.key, "reusing pooled drop");
            return id;
        }

        let id = DropId(self.drops.len() as u32);
        let visual = self.visuals.instantiate(item_type);
        self.instantiated += 1;
        self.drops.push(ItemDrop {
            id,
            item: None,
            cluster: None,
            position: Vec3::ZERO,
            item_type: ItemTypeRef::clone(item_type),
            visual,
            active: false,
        });
        debug!(drop = %id, key = %item_type.key, "pool miss, created drop");
        id
    }

    /// Put `item` into the world on an acquired drop.
    ///
    /// # Arguments
    /// * `id` - Drop returned by [`DropPool::acquire`]
    /// * `item` - Item to hold; rebound to the drop
    /// * `cluster` - Owning cluster
    /// * `position` - Resting position
    pub fn bind(
        &mut self,
        id: DropId,
        mut item: Item,
        cluster: ClusterId,
        position: Vec3,
    ) -> Result<(), TransferError> {
        if item.is_empty() {
            return Err(TransferError::ZeroAmount);
        }
        let drop = self
            .drops
            .get_mut(id.index())
            .filter(|drop| !drop.active)
            .ok_or(TransferError::UnknownDrop(id))?;

        item.move_to_drop(id, position);
        drop.item_type = ItemTypeRef::clone(item.item_type());
        drop.item = Some(item);
        drop.cluster = Some(cluster);
        drop.position = position;
        drop.active = true;
        let visual = drop.visual;
        self.visuals.set_active(visual, true);
        Ok(())
    }

    /// Deactivate a drop and park it for reuse.
    ///
    /// Releasing an inactive drop does nothing.
    ///
    /// # Returns
    /// The held item, unbound, if the drop still had one.
    pub fn release(&mut self, id: DropId) -> Option<Item> {
        let drop = self.drops.get_mut(id.index()).filter(|drop| drop.active)?;
        drop.active = false;
        drop.cluster = None;
        let item = drop.item.take().map(|mut item| {
            item.unbind();
            item
        });
        let visual = drop.visual;
        let key = drop.item_type.key.clone();
        self.visuals.set_active(visual, false);
        self.idle.entry(key).or_default().push(id);
        trace!(drop = %id, "released drop");
        item
    }

    /// Any drop ever created, active or not.
    pub fn get(&self, id: DropId) -> Option<&ItemDrop> {
        self.drops.get(id.index())
    }

    /// Drop `id` if it is in the world.
    pub fn get_active(&self, id: DropId) -> Option<&ItemDrop> {
        self.get(id).filter(|drop| drop.active)
    }

    pub(crate) fn get_active_mut(&mut self, id: DropId) -> Option<&mut ItemDrop> {
        self.drops.get_mut(id.index()).filter(|drop| drop.active)
    }

    /// Drops currently in the world, in arena order.
    pub fn active_drops(&self) -> impl Iterator<Item = &ItemDrop> {
        self.drops.iter().filter(|drop| drop.active)
    }

    /// Active drops within `radius` of `position`, nearest first.
    pub fn drops_within(&self, position: Vec3, radius: f32) -> Vec<DropId> {
        let mut hits: Vec<(DropId, f32)> = self
            .active_drops()
            .map(|drop| (drop.id, drop.position.distance(position)))
            .filter(|(_, distance)| *distance <= radius)
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.into_iter().map(|(id, _)| id).collect()
    }

    /// Occupancy counters.
    pub fn stats(&self) -> PoolStats {
        let active = self.drops.iter().filter(|drop| drop.active).count();
        PoolStats {
            total: self.drops.len(),
            active,
            idle: self.idle.values().map(Vec::len).sum(),
            instantiated: self.instantiated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item_type(key: &str) -> ItemTypeRef {
        Arc::new(ItemType::new(ItemKey::parse(key).unwrap(), key, 64))
    }

    fn spawn(pool: &mut DropPool, item_type: &ItemTypeRef, stack: u32, position: Vec3) -> DropId {
        let id = pool.acquire(item_type);
        pool.bind(id, Item::new(item_type.clone(), stack), ClusterId(1), position)
            .unwrap();
        id
    }

    #[test]
    fn test_bind_rebinds_item_to_drop() {
        let stone = item_type("stone");
        let mut pool = DropPool::default();
        let id = spawn(&mut pool, &stone, 5, Vec3::new(1.0, 0.0, 2.0));

        let drop = pool.get_active(id).unwrap();
        assert!(drop.is_active());
        assert_eq!(drop.cluster(), Some(ClusterId(1)));
        let item = drop.item().unwrap();
        assert_eq!(item.stack(), 5);
        assert_eq!(item.location().drop_id(), Some(id));
    }

    #[test]
    fn test_release_is_idempotent() {
        let stone = item_type("stone");
        let mut pool = DropPool::default();
        let id = spawn(&mut pool, &stone, 5, Vec3::ZERO);

        let item = pool.release(id).unwrap();
        assert!(item.location().is_unbound());
        assert!(pool.release(id).is_none());

        let stats = pool.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.idle, 1);
        assert!(pool.get_active(id).is_none());
    }

    #[test]
    fn test_acquire_reuses_matching_type_only() {
        let stone = item_type("stone");
        let dirt = item_type("dirt");
        let mut pool = DropPool::default();
        let first = spawn(&mut pool, &stone, 1, Vec3::ZERO);
        pool.release(first);

        let other = pool.acquire(&dirt);
        assert_ne!(other, first);
        let again = pool.acquire(&stone);
        assert_eq!(again, first);
        assert_eq!(pool.stats().instantiated, 2);
    }

    #[test]
    fn test_bind_refuses_active_or_unknown_drops() {
        let stone = item_type("stone");
        let mut pool = DropPool::default();
        let id = spawn(&mut pool, &stone, 1, Vec3::ZERO);

        let err = pool
            .bind(id, Item::new(stone.clone(), 1), ClusterId(1), Vec3::ZERO)
            .unwrap_err();
        assert_eq!(err, TransferError::UnknownDrop(id));
        assert_eq!(
            pool.bind(DropId(99), Item::new(stone, 1), ClusterId(1), Vec3::ZERO),
            Err(TransferError::UnknownDrop(DropId(99)))
        );
    }

    #[test]
    fn test_drops_within_sorted_by_distance() {
        let stone = item_type("stone");
        let mut pool = DropPool::default();
        let far = spawn(&mut pool, &stone, 1, Vec3::new(3.0, 0.0, 0.0));
        let near = spawn(&mut pool, &stone, 1, Vec3::new(1.0, 0.0, 0.0));
        let outside = spawn(&mut pool, &stone, 1, Vec3::new(9.0, 0.0, 0.0));

        assert_eq!(pool.drops_within(Vec3::ZERO, 4.0), vec![near, far]);
        pool.release(near);
        assert_eq!(pool.drops_within(Vec3::ZERO, 10.0), vec![far, outside]);
    }
}
