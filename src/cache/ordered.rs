//! Ordered Cache Module
//!
//! Single-threaded cache that orders entries by insertion/refresh time for
//! oldest-first eviction.

use std::collections::HashMap;
use std::fmt;

use crate::cache::entry::{system_time_source, Entry, EvictionHandler, TimeSource};

// == Ordered Cache ==
/// Map from key to payload, ordered for eviction by the time each key was
/// last put.
///
/// Entries live in an array-backed binary min-heap keyed on their order
/// time, with a side map from key to heap slot. Every swap updates both, so
/// lookups are O(1) and insert, refresh, removal and eviction are O(log n).
///
/// The cache does not enforce a size limit. It only orders entries; callers
/// evict until [`len`](Self::len) is where they want it.
pub struct OrderedCache<V> {
    /// Entries in heap order, root is the oldest
    heap: Vec<Entry<V>>,
    /// Key to heap slot
    indexes: HashMap<String, usize>,
    /// Stamps entries on put
    time_source: TimeSource,
}

impl<V> OrderedCache<V> {
    // == Constructors ==
    /// Creates an empty cache stamped by the wall clock in milliseconds.
    pub fn new() -> Self {
        Self::with_time_source(system_time_source())
    }

    /// Creates an empty cache stamped by the given time source.
    pub fn with_time_source(time_source: TimeSource) -> Self {
        Self {
            heap: Vec::new(),
            indexes: HashMap::new(),
            time_source,
        }
    }

    // == Time Source ==
    /// Replaces the time source used for all later puts.
    ///
    /// Entries already present keep their order time.
    pub fn set_time_source(&mut self, time_source: TimeSource) {
        self.time_source = time_source;
    }

    /// Reads the installed time source.
    pub fn now(&self) -> i64 {
        (self.time_source)()
    }

    // == Put ==
    /// Inserts or refreshes `key` without an eviction handler.
    ///
    /// On refresh an existing handler is kept. See
    /// [`put_with_handler`](Self::put_with_handler).
    pub fn put(&mut self, key: impl Into<String>, payload: V) -> Option<V> {
        self.insert(key.into(), payload, None)
    }

    /// Inserts or refreshes `key`, attaching `handler` to be fired when the
    /// entry is evicted or removed.
    ///
    /// A new key is stamped with the current time and sifted into place.
    /// An existing key is refreshed: its time is restamped, its payload
    /// replaced and its heap slot fixed. A refresh never fires a handler.
    /// The first handler attached to a key stays; `handler` is only installed
    /// when the entry has none, and is otherwise dropped uncalled.
    ///
    /// Returns the previous payload when the key already existed.
    pub fn put_with_handler<F>(
        &mut self,
        key: impl Into<String>,
        payload: V,
        handler: F,
    ) -> Option<V>
    where
        F: FnOnce(&str, &V) + Send + Sync + 'static,
    {
        self.insert(key.into(), payload, Some(Box::new(handler)))
    }

    fn insert(
        &mut self,
        key: String,
        payload: V,
        on_evict: Option<EvictionHandler<V>>,
    ) -> Option<V> {
        let now = self.now();

        if let Some(&index) = self.indexes.get(&key) {
            let entry = &mut self.heap[index];
            entry.order_time = now;
            if entry.on_evict.is_none() {
                entry.on_evict = on_evict;
            }
            let previous = std::mem::replace(&mut entry.payload, payload);
            self.fix(index);
            self.debug_check();
            return Some(previous);
        }

        let index = self.heap.len();
        self.indexes.insert(key.clone(), index);
        self.heap.push(Entry::new(key, payload, now, on_evict));
        self.sift_up(index);
        self.debug_check();
        None
    }

    // == Get ==
    /// Returns the payload and order time for `key`. Does not reorder.
    pub fn get(&self, key: &str) -> Option<(&V, i64)> {
        self.indexes.get(key).map(|&index| {
            let entry = &self.heap[index];
            (&entry.payload, entry.order_time)
        })
    }

    /// Checks if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.indexes.contains_key(key)
    }

    // == Peek Oldest ==
    /// Returns the key, payload and order time that
    /// [`evict_oldest`](Self::evict_oldest) would remove next.
    pub fn peek_oldest(&self) -> Option<(&str, &V, i64)> {
        self.heap
            .first()
            .map(|entry| (entry.key.as_str(), &entry.payload, entry.order_time))
    }

    // == Evict Oldest ==
    /// Removes the entry with the smallest order time, fires its handler and
    /// returns its key and payload.
    ///
    /// Returns None if the cache is empty.
    pub fn evict_oldest(&mut self) -> Option<(String, V)> {
        if self.heap.is_empty() {
            return None;
        }
        let entry = self.take(0);
        Some(entry.evict())
    }

    // == Evict Older Than ==
    /// Evicts every entry whose order time is strictly less than `cutoff`.
    ///
    /// Only the expired prefix of the heap is visited. Returns the number of
    /// entries evicted.
    pub fn evict_older_than(&mut self, cutoff: i64) -> usize {
        let mut evicted = 0;
        while matches!(self.heap.first(), Some(entry) if entry.order_time < cutoff) {
            self.evict_oldest();
            evicted += 1;
        }
        evicted
    }

    // == Remove ==
    /// Removes `key` wherever it sits in the heap, firing its handler.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let index = *self.indexes.get(key)?;
        let entry = self.take(index);
        Some(entry.evict().1)
    }

    // == Set Order Time ==
    /// Overrides the order time of `key` and repositions it.
    ///
    /// Returns false if the key is absent.
    pub fn set_order_time(&mut self, key: &str, order_time: i64) -> bool {
        let Some(&index) = self.indexes.get(key) else {
            return false;
        };
        self.heap[index].order_time = order_time;
        self.fix(index);
        self.debug_check();
        true
    }

    // == Length ==
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    // == Heap Internals ==

    /// Detaches the entry at `index` without firing its handler.
    fn take(&mut self, index: usize) -> Entry<V> {
        let entry = self.heap.swap_remove(index);
        self.indexes.remove(&entry.key);
        if index < self.heap.len() {
            self.reindex(index);
            self.fix(index);
        }
        self.debug_check();
        entry
    }

    /// Restores heap order for the entry at `index`, moving it whichever
    /// way is needed.
    fn fix(&mut self, index: usize) {
        if self.sift_up(index) == index {
            self.sift_down(index);
        }
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].order_time >= self.heap[parent].order_time {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.heap[right].order_time < self.heap[left].order_time {
                child = right;
            }
            if self.heap[child].order_time >= self.heap[index].order_time {
                break;
            }
            self.swap(index, child);
            index = child;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.reindex(a);
        self.reindex(b);
    }

    /// Points the index map at the entry now sitting in `index`.
    fn reindex(&mut self, index: usize) {
        match self.indexes.get_mut(&self.heap[index].key) {
            Some(slot) => *slot = index,
            None => debug_assert!(false, "heap slot {index} holds an unindexed key"),
        }
    }

    /// Verifies the index map mirrors the heap and the heap is ordered.
    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn is_consistent(&self) -> bool {
        if self.indexes.len() != self.heap.len() {
            return false;
        }
        self.heap.iter().enumerate().all(|(index, entry)| {
            let indexed = self.indexes.get(&entry.key) == Some(&index);
            let ordered = index == 0 || self.heap[(index - 1) / 2].order_time <= entry.order_time;
            indexed && ordered
        })
    }

    fn debug_check(&self) {
        #[cfg(test)]
        assert!(self.is_consistent(), "heap and index map out of sync");
    }
}

impl<V> Default for OrderedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for OrderedCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedCache")
            .field("len", &self.heap.len())
            .field("oldest", &self.heap.first().map(|e| (&e.key, e.order_time)))
            .finish()
    }
}
