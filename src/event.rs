use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};

use crate::{
    error::WormholeError,
    properties::{MarkerRole, NodeId, WormholeId},
};

/// Notifications emitted by a [`crate::session::MapSession`] while it builds, restores and
/// synchronizes wormholes. Listeners receive them over an optional `std::sync::mpsc` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A map was written to disk.
    MapSaved(PathBuf),
    /// A map's file identity changed (save-as, move, rename).
    MapFileChanged {
        from: Option<PathBuf>,
        to: Option<PathBuf>,
    },
    WormholeCreated {
        id: WormholeId,
        source: NodeId,
        target: NodeId,
    },
    /// A wormhole was rebuilt from a persisted marker. `target` is `None` for one-sided links.
    WormholeRestored {
        id: WormholeId,
        source: NodeId,
        target: Option<NodeId>,
    },
    /// The stored pointer of a marker was overwritten during resynchronization.
    PointerUpdated {
        marker: NodeId,
        role: MarkerRole,
        spec: String,
    },
    /// The target node could not be found; the source pointer now carries the `NOTFOUND` sentinel.
    TargetMissing { source: NodeId },
    WormholeCancelled { reason: WormholeError },
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Event::MapSaved(path) => write!(f, "MapSaved({})", path.display()),
            Event::MapFileChanged { from, to } => write!(
                f,
                "MapFileChanged({:?} -> {:?})",
                from.as_ref().map(|p| p.display().to_string()),
                to.as_ref().map(|p| p.display().to_string())
            ),
            Event::WormholeCreated { source, target, .. } => {
                write!(f, "WormholeCreated({source} -> {target})")
            }
            Event::WormholeRestored { source, target, .. } => match target {
                Some(target) => write!(f, "WormholeRestored({source} -> {target})"),
                None => write!(f, "WormholeRestored({source} -> ?)"),
            },
            Event::PointerUpdated { marker, role, spec } => {
                write!(f, "PointerUpdated({role} {marker}: {spec})")
            }
            Event::TargetMissing { source } => write!(f, "TargetMissing({source})"),
            Event::WormholeCancelled { reason } => write!(f, "WormholeCancelled({reason})"),
        }
    }
}
