//! Locating the other end of a wormhole.
//!
//! A persisted pointer records where the other map *was* and which node it should contain. Maps
//! get moved, renamed and copied between machines, so the recorded location is only a hint. The
//! resolver tries six strategies in order, each one answering "here is a file that exists and
//! contains the node" or nothing:
//!
//! 1. [`ResolveTier::InSitu`]: the hint, taken literally.
//! 2. [`ResolveTier::RelativizeToSource`]: the hint relativized against the source map path.
//! 3. [`ResolveTier::ResolveAgainstSourceParent`]: the hint as a URI reference, joined onto the
//!    source map's directory.
//! 4. [`ResolveTier::SameFolderByName`]: the hint's file name, beside the source map.
//! 5. [`ResolveTier::SearchSubfolders`]: the file name anywhere below the source map's directory.
//! 6. [`ResolveTier::SearchAncestors`]: the file name in each directory above it.
//!
//! A file that exists but does not contain the node never stops the search. Strategies have no
//! side effects beyond loading candidate maps through the [`MapProbe`], so a later tier is never
//! blocked by an earlier one failing.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf, MAIN_SEPARATOR_STR},
};
use url::Url;
use walkdir::{DirEntry, WalkDir};

use crate::{
    config::WormholeConfig,
    map::{MapHandle, MapStore},
    paths::path::{file_name_of, join_spec, relative_path_by_string_manipulation, split_parent},
    properties::NodeId,
};

/// Answers whether a file exists at a path and holds a node with a given durable id.
pub trait MapProbe {
    fn probe(&self, path: &Path, node: &NodeId) -> Option<MapHandle>;
}

/// Probe that loads candidates straight from a [`MapStore`].
pub struct StoreProbe<'a> {
    store: &'a dyn MapStore,
}

impl<'a> StoreProbe<'a> {
    pub fn new(store: &'a dyn MapStore) -> Self {
        StoreProbe { store }
    }
}

impl MapProbe for StoreProbe<'_> {
    fn probe(&self, path: &Path, node: &NodeId) -> Option<MapHandle> {
        if !path.is_file() {
            return None;
        }
        match self.store.load(path) {
            Ok(map) if map.contains_node(node) => Some(map.into_handle()),
            Ok(_) => {
                tracing::debug!(
                    "[StoreProbe] {} exists but holds no node '{}'",
                    path.display(),
                    node
                );
                None
            }
            Err(e) => {
                tracing::debug!("[StoreProbe] could not load {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Bounds for the two directory searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLimits {
    /// Deepest directory level searched below the source map's directory.
    pub max_search_depth: usize,
    /// Number of ancestor directories visited above the source map's directory.
    pub max_ancestor_levels: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_search_depth: 16,
            max_ancestor_levels: 32,
        }
    }
}

impl From<&WormholeConfig> for SearchLimits {
    fn from(config: &WormholeConfig) -> Self {
        SearchLimits {
            max_search_depth: config.max_search_depth,
            max_ancestor_levels: config.max_ancestor_levels,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// Recorded location of the target map.
    pub hint: &'a str,
    /// Durable id of the node the target map must contain.
    pub node: &'a NodeId,
    /// Path of the map holding the pointer.
    pub source_path: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolveTier {
    InSitu,
    RelativizeToSource,
    ResolveAgainstSourceParent,
    SameFolderByName,
    SearchSubfolders,
    SearchAncestors,
}

impl ResolveTier {
    pub const ALL: [ResolveTier; 6] = [
        ResolveTier::InSitu,
        ResolveTier::RelativizeToSource,
        ResolveTier::ResolveAgainstSourceParent,
        ResolveTier::SameFolderByName,
        ResolveTier::SearchSubfolders,
        ResolveTier::SearchAncestors,
    ];

    /// One-based position in the fallback order.
    pub fn ordinal(&self) -> usize {
        match self {
            ResolveTier::InSitu => 1,
            ResolveTier::RelativizeToSource => 2,
            ResolveTier::ResolveAgainstSourceParent => 3,
            ResolveTier::SameFolderByName => 4,
            ResolveTier::SearchSubfolders => 5,
            ResolveTier::SearchAncestors => 6,
        }
    }

    /// Run this tier alone.
    pub fn attempt(
        &self,
        request: &ResolveRequest,
        probe: &dyn MapProbe,
        limits: &SearchLimits,
    ) -> Option<(PathBuf, MapHandle)> {
        match self {
            ResolveTier::InSitu => in_situ(request, probe),
            ResolveTier::RelativizeToSource => relativize_to_source(request, probe),
            ResolveTier::ResolveAgainstSourceParent => resolve_against_source_parent(request, probe),
            ResolveTier::SameFolderByName => same_folder_by_name(request, probe),
            ResolveTier::SearchSubfolders => search_subfolders(request, probe, limits),
            ResolveTier::SearchAncestors => search_ancestors(request, probe, limits),
        }
    }
}

impl Display for ResolveTier {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let name = match self {
            ResolveTier::InSitu => "in-situ",
            ResolveTier::RelativizeToSource => "relativize-to-source",
            ResolveTier::ResolveAgainstSourceParent => "resolve-against-source-parent",
            ResolveTier::SameFolderByName => "same-folder-by-name",
            ResolveTier::SearchSubfolders => "search-subfolders",
            ResolveTier::SearchAncestors => "search-ancestors",
        };
        write!(f, "{} ({})", self.ordinal(), name)
    }
}

/// A located target map.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub map: MapHandle,
    pub tier: ResolveTier,
    pub path: PathBuf,
}

/// Find the map that `request.hint` refers to and that contains `request.node`.
///
/// Returns `None` when every tier fails; callers treat that as "link cannot be completed".
pub fn locate(
    request: &ResolveRequest,
    probe: &dyn MapProbe,
    limits: &SearchLimits,
) -> Option<Resolution> {
    if request.hint.is_empty() || request.node.is_empty() {
        tracing::debug!("[locate] nothing to resolve: empty spec or component id");
        return None;
    }
    for tier in ResolveTier::ALL {
        if let Some((path, map)) = tier.attempt(request, probe, limits) {
            tracing::info!(
                "[locate] '{}' resolved to {} at tier {}",
                request.hint,
                path.display(),
                tier
            );
            return Some(Resolution { map, tier, path });
        }
        tracing::debug!("[locate] tier {} failed for '{}'", tier, request.hint);
    }
    tracing::warn!(
        "[locate] no map reachable from '{}' (source {}) contains '{}'",
        request.hint,
        request.source_path,
        request.node
    );
    None
}

fn probe_at(path: PathBuf, node: &NodeId, probe: &dyn MapProbe) -> Option<(PathBuf, MapHandle)> {
    probe.probe(&path, node).map(|map| (path, map))
}

fn in_situ(request: &ResolveRequest, probe: &dyn MapProbe) -> Option<(PathBuf, MapHandle)> {
    probe_at(PathBuf::from(request.hint), request.node, probe)
}

fn relativize_to_source(
    request: &ResolveRequest,
    probe: &dyn MapProbe,
) -> Option<(PathBuf, MapHandle)> {
    let relative =
        relative_path_by_string_manipulation(request.hint, request.source_path, MAIN_SEPARATOR_STR);
    if relative.is_empty() {
        return None;
    }
    probe_at(PathBuf::from(relative), request.node, probe)
}

fn resolve_against_source_parent(
    request: &ResolveRequest,
    probe: &dyn MapProbe,
) -> Option<(PathBuf, MapHandle)> {
    let (parent, _) = split_parent(request.source_path)?;
    let base = Url::from_directory_path(parent).ok()?;
    let candidate = base.join(request.hint).ok()?.to_file_path().ok()?;
    probe_at(candidate, request.node, probe)
}

fn same_folder_by_name(
    request: &ResolveRequest,
    probe: &dyn MapProbe,
) -> Option<(PathBuf, MapHandle)> {
    let name = file_name_of(request.hint);
    if name.is_empty() {
        return None;
    }
    let (parent, separator) = split_parent(request.source_path)?;
    probe_at(
        PathBuf::from(join_spec(parent, separator, &name)),
        request.node,
        probe,
    )
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn search_subfolders(
    request: &ResolveRequest,
    probe: &dyn MapProbe,
    limits: &SearchLimits,
) -> Option<(PathBuf, MapHandle)> {
    let name = file_name_of(request.hint);
    if name.is_empty() || limits.max_search_depth < 2 {
        return None;
    }
    let (parent, _) = split_parent(request.source_path)?;
    let root = Path::new(parent);
    // Depth 1 entries sit in the source map's own directory, already covered by the same-folder tier.
    WalkDir::new(root)
        .min_depth(2)
        .max_depth(limits.max_search_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) || e.path() == root)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name().to_str() == Some(name.as_str()))
        .find_map(|e| probe_at(e.into_path(), request.node, probe))
}

fn search_ancestors(
    request: &ResolveRequest,
    probe: &dyn MapProbe,
    limits: &SearchLimits,
) -> Option<(PathBuf, MapHandle)> {
    let name = file_name_of(request.hint);
    if name.is_empty() {
        return None;
    }
    let (parent, _) = split_parent(request.source_path)?;
    Path::new(parent)
        .ancestors()
        .skip(1)
        .filter(|dir| !dir.as_os_str().is_empty())
        .take(limits.max_ancestor_levels)
        .find_map(|dir| probe_at(dir.join(&name), request.node, probe))
}
