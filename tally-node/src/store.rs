use std::sync::{Arc, RwLock};

use im::OrdMap;

/// State primitives scoped to one executing transaction. A transaction's own
/// writes are visible to its later reads.
pub trait StateStore {
    /// Absent is not an error.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    /// Upsert; overwrites any prior value.
    fn put(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
    /// Single-pass scan in key order, start inclusive and end exclusive.
    /// Empty bounds on both sides scan the whole key space.
    fn range_scan(&self, start: &[u8], end: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)>>;
}

/// In-memory world state over an immutable ordered map, so scans run against
/// a cheap point-in-time snapshot.
#[derive(Clone, Default)]
pub struct MemStore(Arc<RwLock<OrdMap<Vec<u8>, Vec<u8>>>>);

impl MemStore {
    pub fn new() -> Self {
        Self(Default::default())
    }

    /// An independent copy of the current state. Writes to the fork never
    /// reach this store; evaluate-mode calls execute against a fork.
    pub fn fork(&self) -> Self {
        Self(Arc::new(RwLock::new(self.0.read().unwrap().clone())))
    }
}

impl StateStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.0.read().unwrap().get(key).cloned()
    }

    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.0.write().unwrap().insert(key.into(), value.into());
    }

    fn delete(&mut self, key: &[u8]) {
        self.0.write().unwrap().remove(key);
    }

    fn range_scan(&self, start: &[u8], end: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)>> {
        let snapshot = self.0.read().unwrap().clone();
        let start = start.to_vec();
        let end = end.to_vec();
        Box::new(
            snapshot
                .into_iter()
                .skip_while(move |(k, _)| !start.is_empty() && k.as_slice() < start.as_slice())
                .take_while(move |(k, _)| end.is_empty() || k.as_slice() < end.as_slice()),
        )
    }
}
