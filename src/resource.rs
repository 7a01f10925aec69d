//! Resource pointers carried by wormhole markers.
//!
//! A [`WormholeResource`] is the persisted half of a wormhole: it records where the *other* map
//! lives and which node inside it is the other endpoint. Field names are part of the on-disk
//! contract and must not change.

use serde::{Deserialize, Serialize};

use crate::properties::NodeId;

/// Reserved value of [`WormholeResource::system_spec`] meaning "never set". Distinct from the
/// empty string, which is a legitimate (if useless) spec.
pub const SPEC_UNSET: &str = "<spec-unset>";

/// Resources a marker may carry. Only wormhole resources take part in linking; anything else
/// is preserved untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    Wormhole(WormholeResource),
    Other { spec: String },
}

impl Resource {
    pub fn as_wormhole(&self) -> Option<&WormholeResource> {
        match self {
            Resource::Wormhole(wr) => Some(wr),
            Resource::Other { .. } => None,
        }
    }

    pub fn spec(&self) -> &str {
        match self {
            Resource::Wormhole(wr) => &wr.system_spec,
            Resource::Other { spec } => spec,
        }
    }
}

impl From<WormholeResource> for Resource {
    fn from(wr: WormholeResource) -> Self {
        Resource::Wormhole(wr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WormholeResource {
    /// Durable id of the node at the other end.
    #[serde(rename = "componentURIString")]
    pub component_uri: NodeId,
    /// Durable id of the node that owns this pointer.
    #[serde(rename = "originatingComponentURIString")]
    pub originating_component_uri: NodeId,
    /// Absolute file URI of the map that owns this pointer.
    #[serde(rename = "originatingFilename")]
    pub originating_filename: String,
    /// Location of the other map, relative to the owning map when possible.
    #[serde(rename = "systemSpec")]
    pub system_spec: String,
    /// Last known file name of the other map.
    #[serde(rename = "targetFilename")]
    pub target_filename: String,
}

impl Default for WormholeResource {
    fn default() -> Self {
        WormholeResource {
            component_uri: NodeId::default(),
            originating_component_uri: NodeId::default(),
            originating_filename: String::new(),
            system_spec: SPEC_UNSET.to_string(),
            target_filename: String::new(),
        }
    }
}

impl WormholeResource {
    pub fn is_spec_unset(&self) -> bool {
        self.system_spec == SPEC_UNSET
    }

    /// The best available description of the other map's location: the spec, or the last known
    /// file name when the spec was never set.
    pub fn target_spec(&self) -> &str {
        if self.is_spec_unset() {
            &self.target_filename
        } else {
            &self.system_spec
        }
    }

    /// True when any of the fields a resync is allowed to rewrite differ. `target_filename` is
    /// deliberately excluded: it only ever trails `system_spec`.
    pub fn differs_from(&self, other: &WormholeResource) -> bool {
        self.component_uri != other.component_uri
            || self.originating_component_uri != other.originating_component_uri
            || self.originating_filename != other.originating_filename
            || self.system_spec != other.system_spec
    }
}
