//! The wormhole aggregate: two nodes in two (possibly identical) maps, each carrying a marker
//! whose pointer refers to the other.
//!
//! A [`Wormhole`] is an in-memory view. What persists is the pair of markers and their
//! [`crate::resource::WormholeResource`] pointers; the aggregate is rebuilt from either marker by
//! [`Wormhole::restore`] whenever a map is opened.

pub mod builder;
pub mod guard;
pub mod restorer;
pub mod sync;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

use crate::{
    error::WormholeError,
    map::{same_map, MapHandle},
    properties::{NodeId, WormholeId},
};

pub use guard::ConstructionGuard;
pub use sync::{is_map_file_changed, SyncReport};

/// Progress of a build. Restores jump straight to the stages they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildStage {
    Start,
    ComponentsAndMaps,
    MarkersCreated,
    Placed,
    PointersSet,
    ListenersAttached,
    Done,
    Cancelled,
}

impl Display for BuildStage {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug)]
pub struct Wormhole {
    id: WormholeId,
    source_node: Option<NodeId>,
    source_map: Option<MapHandle>,
    target_node: Option<NodeId>,
    target_map: Option<MapHandle>,
    source_marker: Option<NodeId>,
    target_marker: Option<NodeId>,
    source_file: Option<PathBuf>,
    target_file: Option<PathBuf>,
    stage: BuildStage,
    cancelled: bool,
    failure: Option<WormholeError>,
}

impl Wormhole {
    /// An aggregate with nothing populated. It counts as cancelled until a build or restore
    /// completes.
    pub(crate) fn empty() -> Self {
        Wormhole {
            id: WormholeId::generate(),
            source_node: None,
            source_map: None,
            target_node: None,
            target_map: None,
            source_marker: None,
            target_marker: None,
            source_file: None,
            target_file: None,
            stage: BuildStage::Start,
            cancelled: true,
            failure: None,
        }
    }

    pub fn id(&self) -> WormholeId {
        self.id
    }

    pub fn source_node(&self) -> Option<&NodeId> {
        self.source_node.as_ref()
    }

    pub fn target_node(&self) -> Option<&NodeId> {
        self.target_node.as_ref()
    }

    pub fn source_map(&self) -> Option<&MapHandle> {
        self.source_map.as_ref()
    }

    pub fn target_map(&self) -> Option<&MapHandle> {
        self.target_map.as_ref()
    }

    pub fn source_marker(&self) -> Option<&NodeId> {
        self.source_marker.as_ref()
    }

    pub fn target_marker(&self) -> Option<&NodeId> {
        self.target_marker.as_ref()
    }

    /// File identity of the source map as of the last resync.
    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    pub fn target_file(&self) -> Option<&Path> {
        self.target_file.as_deref()
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn failure(&self) -> Option<&WormholeError> {
        self.failure.as_ref()
    }

    /// A restored link whose target node could not be found.
    pub fn is_one_sided(&self) -> bool {
        !self.cancelled && self.target_marker.is_none()
    }

    pub fn is_attached_to(&self, map: &MapHandle) -> bool {
        self.source_map.as_ref().map(|m| same_map(m, map)).unwrap_or(false)
            || self.target_map.as_ref().map(|m| same_map(m, map)).unwrap_or(false)
    }

    /// Whether `marker` in `map` is one of this wormhole's two markers.
    pub fn owns_marker(&self, map: &MapHandle, marker: &NodeId) -> bool {
        let on = |m: &Option<MapHandle>, id: &Option<NodeId>| {
            m.as_ref().map(|m| same_map(m, map)).unwrap_or(false) && id.as_ref() == Some(marker)
        };
        on(&self.source_map, &self.source_marker) || on(&self.target_map, &self.target_marker)
    }

    /// True when either map's file differs from the identity recorded at the last resync.
    pub fn is_map_file_changed(&self) -> bool {
        let current = |m: &Option<MapHandle>| {
            m.as_ref()
                .and_then(|m| m.read().file().map(Path::to_path_buf))
        };
        is_map_file_changed(self.source_file.as_deref(), current(&self.source_map).as_deref())
            || is_map_file_changed(self.target_file.as_deref(), current(&self.target_map).as_deref())
    }

    pub(crate) fn attach_listeners(&mut self) {
        for map in [self.source_map.as_ref(), self.target_map.as_ref()]
            .into_iter()
            .flatten()
        {
            map.write().add_listener(self.id);
        }
        self.stage = BuildStage::ListenersAttached;
    }

    pub(crate) fn detach_listeners(&self) {
        for map in [self.source_map.as_ref(), self.target_map.as_ref()]
            .into_iter()
            .flatten()
        {
            map.write().remove_listener(&self.id);
        }
    }

    pub(crate) fn finish(&mut self) {
        self.stage = BuildStage::Done;
        self.cancelled = false;
        self.failure = None;
    }

    pub(crate) fn cancel(&mut self, reason: WormholeError) {
        tracing::info!(
            "[Wormhole] {} cancelled at stage {}: {}",
            self.id,
            self.stage,
            reason
        );
        self.detach_listeners();
        self.stage = BuildStage::Cancelled;
        self.cancelled = true;
        self.failure = Some(reason);
    }
}

impl Display for Wormhole {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let node = |n: &Option<NodeId>| n.as_ref().map(|n| n.to_string()).unwrap_or("?".into());
        write!(
            f,
            "Wormhole({} -> {}, {})",
            node(&self.source_node),
            node(&self.target_node),
            self.stage
        )
    }
}
