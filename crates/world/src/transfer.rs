//! Moving items between containers and the world.
//!
//! The coordinator owns the world side of the item graph (clusters, the drop
//! pool and the ground cast). Containers stay with their owners and are
//! passed in per call.

use std::rc::Rc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use stowaway_core::{scoped_rng, ClusterId, DropId, Item};
use tracing::{debug, info, warn};

use crate::cluster::{ClusterGc, ClusterSet};
use crate::container::Container;
use crate::drop_item::DropPool;
use crate::error::TransferError;
use crate::events::{PickupListener, PickupReport};
use crate::ground::GroundQuery;

const SCATTER_SALT: u64 = 0x5CA7_7E12;

/// Placement policy constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// A new drop joins the nearest cluster whose origin is within this distance.
    pub cluster_radius: f32,
    /// Bound of the random horizontal offset applied to scattered drops.
    pub scatter_weight: f32,
    /// Height above the drop position the ground cast starts from.
    pub ground_cast_height: f32,
    /// What happens to clusters that lose their last member.
    pub cluster_gc: ClusterGc,
    /// Seed for scatter offsets.
    pub seed: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            cluster_radius: 5.0,
            scatter_weight: 0.5,
            ground_cast_height: 0.5,
            cluster_gc: ClusterGc::Keep,
            seed: 0,
        }
    }
}

/// Drops items into the world and picks them back up.
pub struct TransferCoordinator {
    config: TransferConfig,
    clusters: ClusterSet,
    pool: DropPool,
    ground: Box<dyn GroundQuery>,
    rng: StdRng,
    pickup_listeners: Vec<Rc<dyn PickupListener>>,
}

impl std::fmt::Debug for TransferCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferCoordinator")
            .field("config", &self.config)
            .field("clusters", &self.clusters.len())
            .field("pool", &self.pool)
            .finish()
    }
}

impl TransferCoordinator {
    /// Create a coordinator with an empty world.
    pub fn new(config: TransferConfig, pool: DropPool, ground: Box<dyn GroundQuery>) -> Self {
        Self {
            rng: scoped_rng(config.seed, SCATTER_SALT),
            config,
            clusters: ClusterSet::new(),
            pool,
            ground,
            pickup_listeners: Vec::new(),
        }
    }

    /// Active policy.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// All clusters.
    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    /// The drop pool.
    pub fn pool(&self) -> &DropPool {
        &self.pool
    }

    /// Register a global pickup observer.
    pub fn subscribe_pickups(&mut self, listener: Rc<dyn PickupListener>) {
        self.pickup_listeners.push(listener);
    }

    /// Eject `amount` from `slot` of `container` into the world.
    ///
    /// A whole stack leaves as the same item; a partial amount leaves as a
    /// new item while the slot keeps the rest.
    pub fn drop_item(
        &mut self,
        container: &mut Container,
        slot: usize,
        amount: u32,
        origin: Vec3,
        scatter: bool,
    ) -> Result<DropId, TransferError> {
        check_origin(origin)?;
        let item = container.take(slot, amount)?;
        self.drop_detached(item, origin, scatter)
    }

    /// Place an already detached item into the world near `origin`.
    ///
    /// The drop joins the nearest cluster within the configured radius of
    /// `origin`, or a new cluster anchored at `origin`. With `scatter` the
    /// resting position gets a random horizontal offset before it is
    /// projected onto the ground.
    pub fn drop_detached(
        &mut self,
        item: Item,
        origin: Vec3,
        scatter: bool,
    ) -> Result<DropId, TransferError> {
        if item.is_empty() {
            return Err(TransferError::ZeroAmount);
        }
        check_origin(origin)?;

        let cluster = self.cluster_for(origin);
        let position = self.resting_position(origin, scatter);
        let key = item.key().clone();
        let stack = item.stack();
        let drop = self.pool.acquire(item.item_type());
        self.pool.bind(drop, item, cluster, position)?;
        if let Some(cluster) = self.clusters.get_mut(cluster) {
            cluster.add_item(drop, position);
        }

        debug!(%drop, %cluster, %key, stack, ?position, "dropped item");
        Ok(drop)
    }

    /// Move the item on `drop` into `container`.
    ///
    /// A fully absorbed stack frees the drop; otherwise the drop stays in its
    /// cluster holding the remainder. Listeners hear about both outcomes.
    pub fn pickup_item(
        &mut self,
        drop: DropId,
        container: &mut Container,
    ) -> Result<PickupReport, TransferError> {
        let entry = self
            .pool
            .get_active_mut(drop)
            .ok_or(TransferError::UnknownDrop(drop))?;
        let cluster = entry.cluster();
        let item = entry.take_item().ok_or(TransferError::UnknownDrop(drop))?;
        let item_type = item.key().clone();
        let before = item.stack();

        let remaining = match container.add_item(item) {
            Some(rest) => {
                let remaining = rest.stack();
                if let Some(entry) = self.pool.get_active_mut(drop) {
                    entry.put_back(rest);
                }
                remaining
            }
            None => {
                self.detach_from_cluster(drop, cluster);
                self.pool.release(drop);
                0
            }
        };

        let report = PickupReport {
            drop,
            cluster,
            container: container.id(),
            item_type,
            absorbed: before - remaining,
            remaining,
        };
        info!(
            %drop,
            container = %report.container,
            key = %report.item_type,
            absorbed = report.absorbed,
            remaining = report.remaining,
            "pickup"
        );
        for listener in &self.pickup_listeners {
            listener.on_item_picked_up(&report);
        }
        Ok(report)
    }

    /// Pick up every active drop within `radius` of `position`, nearest first.
    ///
    /// Stops early once the container is full.
    pub fn pickup_within(
        &mut self,
        container: &mut Container,
        position: Vec3,
        radius: f32,
    ) -> Vec<PickupReport> {
        let mut reports = Vec::new();
        for drop in self.pool.drops_within(position, radius) {
            if container.is_container_full() {
                break;
            }
            if let Ok(report) = self.pickup_item(drop, container) {
                reports.push(report);
            }
        }
        reports
    }

    /// Remove a drop from the world without a destination.
    ///
    /// # Returns
    /// The unbound item the drop held, or `None` for an inactive drop.
    pub fn despawn(&mut self, drop: DropId) -> Option<Item> {
        let cluster = self.pool.get_active(drop)?.cluster();
        self.detach_from_cluster(drop, cluster);
        let item = self.pool.release(drop);
        debug!(%drop, "despawned drop");
        item
    }

    fn cluster_for(&mut self, origin: Vec3) -> ClusterId {
        if let Some(id) = self
            .clusters
            .nearest_within(origin, self.config.cluster_radius)
        {
            return id;
        }
        let cluster = self.clusters.create();
        cluster.set_origin(origin);
        debug!(cluster = %cluster.id(), ?origin, "created cluster");
        cluster.id()
    }

    fn resting_position(&mut self, origin: Vec3, scatter: bool) -> Vec3 {
        let weight = self.config.scatter_weight;
        let position = if scatter && weight > 0.0 {
            origin
                + Vec3::new(
                    self.rng.gen_range(-weight..=weight),
                    0.0,
                    self.rng.gen_range(-weight..=weight),
                )
        } else {
            origin
        };
        let start = position + Vec3::Y * self.config.ground_cast_height;
        self.ground.project_down(start).unwrap_or(position)
    }

    fn detach_from_cluster(&mut self, drop: DropId, cluster: Option<ClusterId>) {
        let Some(id) = cluster else {
            return;
        };
        if let Some(cluster) = self.clusters.get_mut(id) {
            cluster.remove_item(drop);
        }
        if self.config.cluster_gc == ClusterGc::RemoveEmpty && self.clusters.remove_if_empty(id) {
            debug!(cluster = %id, "removed empty cluster");
        }
    }
}

/// Reject positions that would poison cluster distance checks.
pub(crate) fn check_origin(origin: Vec3) -> Result<(), TransferError> {
    if origin.is_finite() {
        Ok(())
    } else {
        warn!(?origin, "refusing to drop at a non-finite position");
        Err(TransferError::NonFinitePosition)
    }
}
