//! In-memory map model and its persistence seam.

pub mod document;
pub mod node;
pub mod store;

pub use document::{same_map, MapDocument, MapHandle};
pub use node::{MapNode, WormholeMarker};
pub use store::{MapStore, TomlMapStore};
