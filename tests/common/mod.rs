//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        mpsc::{channel, Receiver},
        Arc,
    },
};
use tempfile::TempDir;
use wormhole_core::{
    config::WormholeConfig,
    event::Event,
    host::{TargetChoice, WormholeHost},
    map::{MapDocument, MapHandle, MapNode, MapStore, TomlMapStore},
    properties::NodeId,
    resource::WormholeResource,
    session::MapSession,
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Shared, inspectable state of a [`ScriptedHost`] after it moved into a session.
#[derive(Default)]
pub struct HostScript {
    pub targets: VecDeque<TargetChoice>,
    pub save_paths: VecDeque<PathBuf>,
    pub calls: Vec<String>,
}

#[allow(dead_code)]
impl HostScript {
    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// Host answering from a script the test keeps a handle to.
#[derive(Clone, Default)]
pub struct ScriptedHost {
    pub script: Arc<Mutex<HostScript>>,
}

#[allow(dead_code)]
impl ScriptedHost {
    pub fn new() -> Self {
        ScriptedHost::default()
    }

    pub fn push_existing(&self, map: MapHandle) {
        self.script.lock().targets.push_back(TargetChoice::ExistingMap(map));
    }

    /// Queue a brand-new target map and the file it will be saved to.
    pub fn push_new(&self, label: &str, path: PathBuf) -> MapHandle {
        let map = MapDocument::new(label).into_handle();
        let mut script = self.script.lock();
        script.targets.push_back(TargetChoice::NewMap(map.clone()));
        script.save_paths.push_back(path);
        map
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.script.lock().count(prefix)
    }

    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }
}

impl WormholeHost for ScriptedHost {
    fn choose_target_map(&self, _current: &MapHandle) -> Option<TargetChoice> {
        let mut script = self.script.lock();
        script.calls.push("choose_target_map".to_string());
        script.targets.pop_front()
    }

    fn choose_save_path(&self, map: &MapDocument) -> Option<PathBuf> {
        let mut script = self.script.lock();
        script.calls.push(format!("choose_save_path {}", map.label));
        script.save_paths.pop_front()
    }

    fn redisplay(&self, path: &Path) {
        self.script
            .lock()
            .calls
            .push(format!("redisplay {}", path.display()));
    }
}

/// Session over the TOML store, wired to an event receiver.
#[allow(dead_code)]
pub fn open_session_with(host: &ScriptedHost, config: WormholeConfig) -> (MapSession, Receiver<Event>) {
    init_logging();
    let (tx, rx) = channel();
    let session = MapSession::new(Box::new(TomlMapStore::new()), Box::new(host.clone()), config)
        .with_events(tx);
    (session, rx)
}

#[allow(dead_code)]
pub fn open_session(host: &ScriptedHost) -> (MapSession, Receiver<Event>) {
    open_session_with(host, WormholeConfig::default())
}

/// Write a map holding one top-level node per `(id, label)` pair. Parent directories are
/// created as needed.
#[allow(dead_code)]
pub fn write_map(path: &Path, nodes: &[(&str, &str)]) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut map = MapDocument::new(
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    );
    for (id, label) in nodes {
        map.add_node(MapNode::with_id(NodeId::from(*id), *label));
    }
    TomlMapStore::new().save(&map, path).unwrap();
    path.to_path_buf()
}

#[allow(dead_code)]
pub fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

#[allow(dead_code)]
pub fn load(path: &Path) -> MapDocument {
    TomlMapStore::new().load(path).unwrap()
}

/// Every wormhole pointer in the map on disk, as `(host node, pointer)`.
#[allow(dead_code)]
pub fn pointers_on_disk(path: &Path) -> Vec<(NodeId, WormholeResource)> {
    let map = load(path);
    map.wormhole_markers()
        .into_iter()
        .filter_map(|(host, marker)| {
            map.find_marker(&marker)
                .and_then(|(_, m)| m.wormhole_resource().cloned())
                .map(|wr| (host, wr))
        })
        .collect()
}

#[allow(dead_code)]
pub fn drain(rx: &Receiver<Event>) -> Vec<Event> {
    rx.try_iter().collect()
}
