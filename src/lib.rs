//! # wormhole-core
//!
//! Bidirectional links ("wormholes") between nodes of independently editable maps.
//!
//! ## Overview
//!
//! A wormhole couples a node in map A to a node in map B. Each end carries a marker whose
//! resource pointer records where the other map lives and which node inside it is the other end.
//! Maps get moved, renamed, copied to other machines and re-parented, so wormhole-core keeps those
//! pointers truthful and re-finds the other end when the recorded location has gone stale.
//!
//! ### Key Features
//!
//! - **Six-tier resolution**: a stale location is retried literally, relative to the source map,
//!   by name beside it, below it and above it, until a file holding the target node turns up
//! - **Symmetric pointers**: both ends always describe each other, never themselves
//! - **Idempotent resync**: pointers are rewritten, and maps saved, only when something changed
//! - **Re-parenting**: a marker moved to another node keeps its wormhole
//! - **Pluggable collaborators**: persistence ([`map::MapStore`]) and UI ([`host::WormholeHost`])
//!   are traits; a TOML store and a headless host ship with the crate
//!
//! ## Architecture
//!
//! - **[`properties`]**: durable ids, marker roles, node kinds, bounds
//! - **[`resource`]**: the persisted pointer carried by each marker
//! - **[`paths`]**: string helpers for map locations and the six-tier [`paths::locate`]
//! - **[`map`]**: the in-memory map model and the [`map::MapStore`] seam
//! - **[`wormhole`]**: the [`wormhole::Wormhole`] aggregate with its builder, restorer and
//!   synchronizer
//! - **[`session`]**: open maps, live wormholes and change dispatch
//! - **[`layout`]**: overlap handling for freshly placed target nodes
//! - **[`event`]**: notifications streamed while the session works
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use wormhole_core::{
//!     config::WormholeConfig, host::HeadlessHost, map::TomlMapStore, properties::NodeId,
//!     session::MapSession,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = HeadlessHost::new().with_new_target("B", PathBuf::from("maps/B.map"));
//!     let mut session = MapSession::new(
//!         Box::new(TomlMapStore::new()),
//!         Box::new(host),
//!         WormholeConfig::default(),
//!     );
//!     let source = session.open_map(&PathBuf::from("maps/A.map"))?;
//!     let id = session.create_wormhole(&source, &NodeId::from("n1"))?;
//!     println!("created wormhole {id}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod host;
pub mod layout;
pub mod map;
pub mod paths;
pub mod properties;
pub mod resource;
pub mod session;
#[cfg(test)]
mod tests;
pub mod wormhole;

pub use error::*;
