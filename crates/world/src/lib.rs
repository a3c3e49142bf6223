#![warn(missing_docs)]
//! Item location and transfer engine: containers, world drops, clusters and drags.

mod cluster;
mod container;
mod drag;
mod drop_item;
mod error;
mod events;
mod ground;
mod transfer;

pub use cluster::*;
pub use container::*;
pub use drag::*;
pub use drop_item::*;
pub use error::*;
pub use events::*;
pub use ground::*;
pub use transfer::*;
