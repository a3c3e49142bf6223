#![warn(missing_docs)]
//! Core item primitives shared across the workspace.

pub mod ids;
pub mod item;
pub mod item_type;
pub mod key;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use ids::{ClusterId, ContainerId, DropId, ItemId};
pub use item::{Item, ItemLocation, ItemSnapshot};
pub use item_type::{ItemError, ItemType, ItemTypeRef, ItemTypeRegistry, RegistryLoadError};
pub use key::{ItemKey, ItemKeyError};

/// Fixed simulation tick; drag gestures and scripts are expressed in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick of every run.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Reproducible RNG derived from a run seed and a subsystem salt.
pub fn scoped_rng(seed: u64, salt: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ salt.rotate_left(17))
}
