//! Bounded, age-limited key/value cache.
//!
//! Entries carry the time they were last touched (inserted or fetched).
//! Two limits apply:
//! - **capacity**: when an insert pushes the entry count past the capacity,
//!   the least-recently-touched entries are evicted until it fits again;
//! - **max age**: an entry untouched for longer than the max age is treated
//!   as absent and purged the next time it is looked up (or by [`sweep`]).
//!
//! Values are shared as `Arc<V>` so holders outlive eviction. All operations
//! take one internal mutex for their whole duration, which makes
//! [`fetch_or_insert`] atomic for callers racing on the same key.
//!
//! [`sweep`]: ExpiringCache::sweep
//! [`fetch_or_insert`]: ExpiringCache::fetch_or_insert

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::clock::Clock;
use crate::time::format_duration;

struct Slot<V> {
    value: Arc<V>,
    touched: Duration,
    /// Recency rank; larger is more recent. Keys `recency`.
    tick: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// Tick -> key, oldest first. Always holds exactly one tick per entry.
    recency: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K: Clone + Eq + Hash, V> Inner<K, V> {
    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn remove(&mut self, key: &K) -> Option<Slot<V>> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot)
    }

    /// Refresh an existing entry's timestamp and recency.
    fn touch(&mut self, key: &K, now: Duration) -> Option<Arc<V>> {
        let tick = self.bump();
        let slot = self.entries.get_mut(key)?;
        self.recency.remove(&slot.tick);
        slot.tick = tick;
        slot.touched = now;
        self.recency.insert(tick, key.clone());
        Some(Arc::clone(&slot.value))
    }

    fn put(&mut self, key: K, value: Arc<V>, now: Duration) {
        let tick = self.bump();
        if let Some(old) = self.entries.insert(
            key.clone(),
            Slot {
                value,
                touched: now,
                tick,
            },
        ) {
            self.recency.remove(&old.tick);
        }
        self.recency.insert(tick, key);
    }

    fn evict_over(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > capacity {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&key);
            evicted += 1;
        }
        evicted
    }
}

/// Snapshot of a cache's size and hit statistics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheInfo {
    pub name: String,
    pub size: usize,
    pub capacity: usize,
    pub max_age: String,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
}

/// A thread-safe cache bounded by entry count and entry age.
pub struct ExpiringCache<K, V> {
    name: String,
    capacity: usize,
    max_age: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Clone + Eq + Hash, V> ExpiringCache<K, V> {
    /// Create an empty cache. A capacity of zero retains nothing.
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        max_age: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            max_age,
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                next_tick: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // Every mutation of `Inner` completes before any call that can panic.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, touched: Duration, now: Duration) -> bool {
        now.saturating_sub(touched) > self.max_age
    }

    /// Drop `key` if it is present but expired. Returns whether a fresh
    /// entry remains.
    fn purge_if_stale(&self, inner: &mut Inner<K, V>, key: &K, now: Duration) -> bool {
        let stale = match inner.entries.get(key) {
            Some(slot) => self.is_expired(slot.touched, now),
            None => return false,
        };
        if stale {
            inner.remove(key);
        }
        !stale
    }

    /// Insert or overwrite `key`. Returns whether a fresh entry for the key
    /// already existed.
    pub fn insert_or_assign(&self, key: K, value: Arc<V>) -> bool {
        let now = self.clock.now();
        let mut inner = self.lock();
        let existed = self.purge_if_stale(&mut inner, &key, now);
        inner.put(key, value, now);
        let evicted = inner.evict_over(self.capacity);
        if evicted > 0 {
            tracing::trace!(cache = %self.name, evicted, "capacity eviction");
        }
        existed
    }

    /// Look up `key`, refreshing it on a hit.
    pub fn fetch(&self, key: &K) -> Option<Arc<V>> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let found = if self.purge_if_stale(&mut inner, key, now) {
            inner.touch(key, now)
        } else {
            None
        };
        drop(inner);
        self.record_lookup(found.is_some());
        found
    }

    /// Return the fresh value stored under `key`, or store `value` and return
    /// it. Concurrent callers for the same key all observe the same value.
    pub fn fetch_or_insert(&self, key: K, value: Arc<V>) -> Arc<V> {
        let now = self.clock.now();
        let mut inner = self.lock();
        if self.purge_if_stale(&mut inner, &key, now) {
            if let Some(existing) = inner.touch(&key, now) {
                drop(inner);
                self.record_lookup(true);
                return existing;
            }
        }
        inner.put(key, Arc::clone(&value), now);
        inner.evict_over(self.capacity);
        drop(inner);
        self.record_lookup(false);
        value
    }

    /// Remove every entry whose value matches `predicate`. Returns the
    /// number removed.
    pub fn erase_if<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        let mut inner = self.lock();
        let doomed: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, slot)| predicate(slot.value.as_ref()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            inner.remove(key);
        }
        doomed.len()
    }

    /// Purge every expired entry. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.lock();
        let stale: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, slot)| self.is_expired(slot.touched, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            inner.remove(key);
        }
        if !stale.is_empty() {
            tracing::debug!(cache = %self.name, removed = stale.len(), "swept expired entries");
        }
        stale.len()
    }

    /// Number of entries currently held, including any not yet purged for age.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn info(&self) -> CacheInfo {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheInfo {
            name: self.name.clone(),
            size: self.len(),
            capacity: self.capacity,
            max_age: format_duration(self.max_age),
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}
