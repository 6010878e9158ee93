use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
struct Entries {
    vectors: HashMap<String, Arc<[f32]>>,
    // Insertion order, oldest first
    order: VecDeque<String>,
}

/// Thread-safe memo of phrase embeddings. Once `capacity` phrases are stored,
/// the oldest insertion is evicted first.
#[derive(Debug)]
pub struct VectorCache {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl Default for VectorCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl VectorCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.read().vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Arc<[f32]>> {
        self.entries.read().vectors.get(key).cloned()
    }

    /// Returns the cached vector for `key`, computing it with `compute` on a miss.
    ///
    /// `compute` runs without holding the lock, so concurrent misses on the
    /// same key may compute it twice; the first insertion wins.
    pub fn get_or_insert_with(&self, key: &str, compute: impl FnOnce() -> Vec<f32>) -> Arc<[f32]> {
        if let Some(vector) = self.get(key) {
            return vector;
        }

        let vector: Arc<[f32]> = compute().into();
        if self.capacity == 0 {
            return vector;
        }

        let mut entries = self.entries.write();
        if let Some(existing) = entries.vectors.get(key) {
            return existing.clone();
        }

        while entries.order.len() >= self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.vectors.remove(&oldest);
                }
                None => break,
            }
        }

        entries.order.push_back(key.to_owned());
        entries.vectors.insert(key.to_owned(), vector.clone());
        vector
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.vectors.clear();
        entries.order.clear();
    }
}
