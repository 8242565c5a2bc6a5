//! An LRU cache for rendered frames.
//!
//! Rendering a frame through the display pipeline is pure CPU work
//! keyed entirely by its inputs, so viewers cache results under a
//! fingerprint of (SOP instance UID, frame index, window parameters,
//! transform flags). Eviction triggers on an entry count or a byte
//! budget, whichever is exceeded first. Lookups take a shared lock;
//! insertions take it exclusively.

use crate::lut::WindowLevel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The fingerprint identifying one rendered frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey {
    /// the SOP instance UID of the source object
    pub sop_instance_uid: String,
    /// the frame index
    pub frame: u32,
    /// the window parameters, as raw bit patterns so the key can hash
    window_bits: Option<(u64, u64)>,
    /// free-form transform flags (rotation, flip, inversion, ...)
    pub flags: u32,
}

impl FrameKey {
    /// Build a fingerprint from the rendering inputs.
    pub fn new(
        sop_instance_uid: impl Into<String>,
        frame: u32,
        window: Option<WindowLevel>,
        flags: u32,
    ) -> Self {
        FrameKey {
            sop_instance_uid: sop_instance_uid.into(),
            frame,
            window_bits: window.map(|w| (w.center.to_bits(), w.width.to_bits())),
            flags,
        }
    }
}

#[derive(Debug)]
struct Entry {
    data: Arc<Vec<u8>>,
    // bumped by readers under the shared lock
    last_used: AtomicU64,
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<FrameKey, Entry>,
    bytes: usize,
}

/// Cache hit/miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// lookups which found their key
    pub hits: u64,
    /// lookups which did not
    pub misses: u64,
    /// entries evicted so far
    pub evictions: u64,
}

/// A thread-safe LRU cache over rendered frame buffers.
#[derive(Debug)]
pub struct FrameCache {
    inner: RwLock<Inner>,
    max_entries: usize,
    max_bytes: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl FrameCache {
    /// Create a cache bounded by an entry count and a byte budget.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        FrameCache {
            inner: RwLock::new(Inner::default()),
            max_entries,
            max_bytes,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a rendered frame.
    ///
    /// A miss does not pin the key absent; a writer may insert it
    /// between this call and any follow-up.
    pub fn get(&self, key: &FrameKey) -> Option<Arc<Vec<u8>>> {
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = self.inner.read().expect("frame cache lock poisoned");
        match inner.map.get(key) {
            Some(entry) => {
                entry.last_used.fetch_max(stamp, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.data))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a rendered frame, evicting least-recently-used entries
    /// until both budgets hold.
    pub fn put(&self, key: FrameKey, data: Vec<u8>) -> Arc<Vec<u8>> {
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        let data = Arc::new(data);
        let mut inner = self.inner.write().expect("frame cache lock poisoned");

        if let Some(old) = inner.map.remove(&key) {
            inner.bytes -= old.data.len();
        }
        inner.bytes += data.len();
        inner.map.insert(
            key,
            Entry {
                data: Arc::clone(&data),
                last_used: AtomicU64::new(stamp),
            },
        );

        while inner.map.len() > self.max_entries || inner.bytes > self.max_bytes {
            let Some(lru_key) = inner
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_used.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            if let Some(entry) = inner.map.remove(&lru_key) {
                inner.bytes -= entry.data.len();
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        data
    }

    /// The number of cached frames.
    pub fn len(&self) -> usize {
        self.inner.read().expect("frame cache lock poisoned").map.len()
    }

    /// Whether the cache holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The total bytes held by cached frames.
    pub fn bytes(&self) -> usize {
        self.inner.read().expect("frame cache lock poisoned").bytes
    }

    /// Hit, miss and eviction counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Drop every cached frame, keeping the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("frame cache lock poisoned");
        inner.map.clear();
        inner.bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(uid: &str, frame: u32) -> FrameKey {
        FrameKey::new(uid, frame, None, 0)
    }

    #[test]
    fn get_and_put() {
        let cache = FrameCache::new(8, 1 << 20);
        assert!(cache.get(&key("1.2.3", 0)).is_none());
        cache.put(key("1.2.3", 0), vec![1, 2, 3]);
        assert_eq!(cache.get(&key("1.2.3", 0)).unwrap().as_slice(), &[1, 2, 3]);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn window_parameters_distinguish_keys() {
        let cache = FrameCache::new(8, 1 << 20);
        let windowed = FrameKey::new(
            "1.2.3",
            0,
            Some(WindowLevel {
                center: 40.0,
                width: 400.0,
            }),
            0,
        );
        cache.put(windowed.clone(), vec![9]);
        assert!(cache.get(&key("1.2.3", 0)).is_none());
        assert!(cache.get(&windowed).is_some());
    }

    #[test]
    fn count_budget_evicts_least_recently_used() {
        let cache = FrameCache::new(2, 1 << 20);
        cache.put(key("a", 0), vec![0; 8]);
        cache.put(key("b", 0), vec![0; 8]);
        // touch "a" so "b" becomes the eviction candidate
        cache.get(&key("a", 0));
        cache.put(key("c", 0), vec![0; 8]);

        assert!(cache.get(&key("a", 0)).is_some());
        assert!(cache.get(&key("b", 0)).is_none());
        assert!(cache.get(&key("c", 0)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn byte_budget_evicts_before_count_budget() {
        let cache = FrameCache::new(100, 20);
        cache.put(key("a", 0), vec![0; 12]);
        cache.put(key("b", 0), vec![0; 12]);
        assert_eq!(cache.len(), 1);
        assert!(cache.bytes() <= 20);
    }

    #[test]
    fn concurrent_readers() {
        let cache = Arc::new(FrameCache::new(16, 1 << 20));
        cache.put(key("shared", 0), vec![7; 64]);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(cache.get(&key("shared", 0)).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.stats().hits, 800);
    }
}
