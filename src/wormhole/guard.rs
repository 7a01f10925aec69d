use crate::map::MapHandle;

/// Marks a map as under construction for as long as the guard lives.
///
/// While any guard on a map is alive, file identity changes on that map do not trigger a resync.
/// Guards are counted, so a wormhole whose two ends sit in the same map can hold two.
///
/// Dropping a guard takes the map's write lock; never drop one while holding a lock on its map.
#[derive(Debug)]
pub struct ConstructionGuard {
    map: MapHandle,
}

impl ConstructionGuard {
    pub fn acquire(map: &MapHandle) -> Self {
        map.write().begin_construction();
        ConstructionGuard { map: map.clone() }
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        self.map.write().end_construction();
    }
}
