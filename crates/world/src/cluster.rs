//! Spatial grouping of world drops.
//!
//! A cluster keeps nearby drops logically associated. Its origin is fixed the
//! first time it is set and never follows its members around.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use stowaway_core::{ClusterId, DropId};

/// What happens to a cluster whose last member leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterGc {
    /// Emptied clusters stay around and keep attracting new drops.
    #[default]
    Keep,
    /// Emptied clusters are removed immediately.
    RemoveEmpty,
}

/// A group of drops sharing an origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    id: ClusterId,
    origin: Option<Vec3>,
    members: Vec<(DropId, Vec3)>,
}

impl Cluster {
    /// Create an empty cluster without an origin.
    pub fn new(id: ClusterId) -> Self {
        Self {
            id,
            origin: None,
            members: Vec::new(),
        }
    }

    /// Cluster identity.
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Fixed origin, once set.
    pub fn origin(&self) -> Option<Vec3> {
        self.origin
    }

    /// Set the origin if it has never been set.
    ///
    /// # Returns
    /// `true` when this call fixed the origin.
    pub fn set_origin(&mut self, origin: Vec3) -> bool {
        if self.origin.is_some() {
            return false;
        }
        self.origin = Some(origin);
        true
    }

    /// Append a member; the first member ever added fixes the origin.
    pub fn add_item(&mut self, drop: DropId, position: Vec3) {
        self.set_origin(position);
        self.members.push((drop, position));
    }

    /// Remove a member. The origin stays where it is.
    ///
    /// # Returns
    /// `true` if `drop` was a member.
    pub fn remove_item(&mut self, drop: DropId) -> bool {
        match self.members.iter().position(|(member, _)| *member == drop) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether `drop` is a member.
    pub fn contains(&self, drop: DropId) -> bool {
        self.members.iter().any(|(member, _)| *member == drop)
    }

    /// Member drops in insertion order.
    pub fn drops(&self) -> impl Iterator<Item = DropId> + '_ {
        self.members.iter().map(|(drop, _)| *drop)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mean position of the members; `None` when empty.
    pub fn center(&self) -> Option<Vec3> {
        if self.members.is_empty() {
            return None;
        }
        let sum: Vec3 = self.members.iter().map(|(_, position)| *position).sum();
        Some(sum / self.members.len() as f32)
    }

    /// Serializable view of the cluster.
    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            id: self.id,
            origin: self.origin,
            drops: self.drops().collect(),
        }
    }
}

/// Plain-data view of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Cluster identity.
    pub id: ClusterId,
    /// Fixed origin.
    pub origin: Option<Vec3>,
    /// Members in insertion order.
    pub drops: Vec<DropId>,
}

/// Every cluster in the world, in creation order.
#[derive(Debug, Default)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
    next_id: u64,
}

impl ClusterSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Nearest cluster whose origin lies within `radius` of `position`.
    ///
    /// Linear scan in creation order. A cluster exactly at `radius` still
    /// qualifies; on equal distances the earlier cluster wins.
    pub fn nearest_within(&self, position: Vec3, radius: f32) -> Option<ClusterId> {
        let mut best: Option<(ClusterId, f32)> = None;
        for cluster in &self.clusters {
            let Some(origin) = cluster.origin else {
                continue;
            };
            let distance = origin.distance(position);
            // NaN distances never qualify
            if !(distance <= radius) {
                continue;
            }
            if best.map_or(true, |(_, closest)| distance < closest) {
                best = Some((cluster.id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Create an empty cluster and return it.
    pub fn create(&mut self) -> &mut Cluster {
        self.next_id += 1;
        let index = self.clusters.len();
        self.clusters.push(Cluster::new(ClusterId(self.next_id)));
        &mut self.clusters[index]
    }

    /// Cluster with `id`.
    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    /// Mutable cluster with `id`.
    pub fn get_mut(&mut self, id: ClusterId) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|cluster| cluster.id == id)
    }

    /// Clusters in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }

    /// Number of clusters, empty ones included.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether no cluster exists.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Remove `id` if it has no members.
    ///
    /// # Returns
    /// `true` if a cluster was removed.
    pub fn remove_if_empty(&mut self, id: ClusterId) -> bool {
        match self.clusters.iter().position(|cluster| cluster.id == id) {
            Some(index) if self.clusters[index].is_empty() => {
                self.clusters.remove(index);
                true
            }
            _ => false,
        }
    }

    /// Drop every cluster without members.
    ///
    /// # Returns
    /// Number of clusters removed.
    pub fn remove_empty(&mut self) -> usize {
        let before = self.clusters.len();
        self.clusters.retain(|cluster| !cluster.is_empty());
        before - self.clusters.len()
    }
}
