/// [crate::properties] contains the identifiers and small value types shared by the map model,
/// the resource pointers and the wormhole aggregate.
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

pub use uuid::Uuid;

use crate::error::WormholeError;

/// Node field of every minted v6 UUID.
pub const UUID_NODE_WORMHOLE: [u8; 6] = [0x77, 0x6f, 0x72, 0x6d, 0x68, 0x6c];

/// Sentinel component URI written into a source pointer whose target node has gone missing.
pub const NOTFOUND: &str = "NOTFOUND";

/// Durable node identifier.
///
/// Stable across save/reload and independent of in-memory identity. Freshly minted ids are
/// time-ordered UUIDs (v6), but any non-empty string read back from a persisted map is accepted
/// verbatim, since older maps carry arbitrary component URIs.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        NodeId(id.into())
    }

    pub fn generate() -> Self {
        NodeId(
            Uuid::now_v6(&UUID_NODE_WORMHOLE)
                .hyphenated()
                .encode_lower(&mut Uuid::encode_buffer())
                .to_string(),
        )
    }

    /// The `NOTFOUND` sentinel.
    pub fn not_found() -> Self {
        NodeId(NOTFOUND.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.0 == NOTFOUND
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime identity of a live [`crate::wormhole::Wormhole`]. Never persisted: listeners are
/// re-attached after every reload.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct WormholeId(Uuid);

impl WormholeId {
    pub fn generate() -> Self {
        WormholeId(Uuid::now_v6(&UUID_NODE_WORMHOLE))
    }
}

impl Default for WormholeId {
    fn default() -> Self {
        WormholeId::generate()
    }
}

impl TryFrom<&str> for WormholeId {
    type Error = WormholeError;

    fn try_from(string: &str) -> Result<Self, Self::Error> {
        Ok(WormholeId(Uuid::parse_str(string)?))
    }
}

impl Display for WormholeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0.hyphenated().encode_lower(&mut Uuid::encode_buffer())
        )
    }
}

/// Which end of a wormhole a marker sits on. Serialized as its upper-case name.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum MarkerRole {
    #[default]
    #[serde(rename = "SOURCE")]
    Source,
    #[serde(rename = "TARGET")]
    Target,
}

impl MarkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerRole::Source => "SOURCE",
            MarkerRole::Target => "TARGET",
        }
    }

    pub fn opposite(&self) -> MarkerRole {
        match self {
            MarkerRole::Source => MarkerRole::Target,
            MarkerRole::Target => MarkerRole::Source,
        }
    }
}

impl Display for MarkerRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MarkerRole {
    type Err = WormholeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOURCE" => Ok(MarkerRole::Source),
            "TARGET" => Ok(MarkerRole::Target),
            other => Err(WormholeError::Serialization(format!(
                "Unknown wormhole role '{other}'"
            ))),
        }
    }
}

/// The kinds of element a map holds.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Node,
    /// Grouping container; its children are laid out with the rest of the map.
    Group,
    /// Map layer; a grouping container spanning the whole map.
    Layer,
    /// Connector between two nodes. Never considered for overlap.
    Link,
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Group | NodeKind::Layer)
    }

    pub fn is_connector(&self) -> bool {
        matches!(self, NodeKind::Link)
    }
}

/// Axis-aligned bounding region of a node in map coordinates.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Bounds {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the two regions share interior area. Touching edges do not count.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}
