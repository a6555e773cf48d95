//! LRU Index Module
//!
//! Recency-ordered index of cache entries: an arena-backed doubly-linked list
//! plus a key lookup table.

use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::CacheEntry;

/// Null link in the arena list.
const NIL: usize = usize::MAX;

/// Stable handle to an occupied slot of an [`LruIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<CacheEntry<K, V>>,
    prev: usize,
    next: usize,
}

// == LRU Index ==
/// Tracks access order for LRU eviction strategy.
///
/// Slots are linked where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Every operation except [`clear`](Self::clear) is O(1) (lookups are O(1) on average).
#[derive(Debug)]
pub struct LruIndex<K, V> {
    /// Key to slot lookup table
    lookup: HashMap<K, usize>,
    /// Arena of list nodes
    slots: Vec<Slot<K, V>>,
    /// Recycled arena positions
    free: Vec<usize>,
    head: usize,
    tail: usize,
}

impl<K, V> Default for LruIndex<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LruIndex<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            lookup: HashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
        }
    }

    // == Lookup ==
    /// Returns the slot holding `key`, if any. Does not change recency.
    pub fn lookup(&self, key: &K) -> Option<SlotId> {
        self.lookup.get(key).copied().map(SlotId)
    }

    /// Returns the slot and entry for `key`. Does not change recency.
    pub fn get(&self, key: &K) -> Option<(SlotId, &CacheEntry<K, V>)> {
        let slot = *self.lookup.get(key)?;
        self.slots[slot]
            .entry
            .as_ref()
            .map(|entry| (SlotId(slot), entry))
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, key: &K) -> Option<(SlotId, &mut CacheEntry<K, V>)> {
        let slot = *self.lookup.get(key)?;
        self.slots[slot]
            .entry
            .as_mut()
            .map(|entry| (SlotId(slot), entry))
    }

    // == Move To Front ==
    /// Marks `slot` as the most recently used.
    pub fn move_to_front(&mut self, slot: SlotId) {
        if !self.is_occupied(slot.0) || self.head == slot.0 {
            return;
        }
        self.unlink(slot.0);
        self.link_front(slot.0);
    }

    // == Push Front ==
    /// Inserts a new most-recently-used entry.
    ///
    /// The entry's key must not already be present; callers update existing
    /// keys through [`get_mut`](Self::get_mut) instead.
    pub fn push_front(&mut self, entry: CacheEntry<K, V>) -> SlotId {
        debug_assert!(!self.lookup.contains_key(&entry.key));

        let key = entry.key.clone();
        let node = Slot {
            entry: Some(entry),
            prev: NIL,
            next: NIL,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = node;
                slot
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        };

        self.link_front(slot);
        self.lookup.insert(key, slot);
        SlotId(slot)
    }

    // == Remove Back ==
    /// Removes and returns the least recently used entry.
    ///
    /// Returns None if the index is empty.
    pub fn remove_back(&mut self) -> Option<CacheEntry<K, V>> {
        if self.tail == NIL {
            return None;
        }
        self.remove(SlotId(self.tail))
    }

    // == Remove ==
    /// Removes an arbitrary entry. Removing a vacant slot is a no-op.
    pub fn remove(&mut self, slot: SlotId) -> Option<CacheEntry<K, V>> {
        if !self.is_occupied(slot.0) {
            return None;
        }
        self.unlink(slot.0);
        let entry = self.slots[slot.0].entry.take()?;
        self.lookup.remove(&entry.key);
        self.free.push(slot.0);
        Some(entry)
    }

    /// Iterates over entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            current: self.head,
        }
    }

    // == Length ==
    /// Returns the number of indexed keys.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.lookup.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    // == Internal List Operations ==
    fn is_occupied(&self, slot: usize) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|s| s.entry.is_some())
    }

    fn unlink(&mut self, slot: usize) {
        let prev = self.slots[slot].prev;
        let next = self.slots[slot].next;

        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.slots[slot].prev = NIL;
        self.slots[slot].next = NIL;
    }

    fn link_front(&mut self, slot: usize) {
        self.slots[slot].prev = NIL;
        self.slots[slot].next = self.head;

        if self.head != NIL {
            self.slots[self.head].prev = slot;
        }
        self.head = slot;

        if self.tail == NIL {
            self.tail = slot;
        }
    }
}

/// Iterator from most recently used to least recently used.
pub struct Iter<'a, K, V> {
    slots: &'a [Slot<K, V>],
    current: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = &'a CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.get(self.current)?;
        self.current = slot.next;
        slot.entry.as_ref()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn insert(lru: &mut LruIndex<String, u32>, key: &str) -> SlotId {
        lru.push_front(CacheEntry::new(key.to_string(), 0, None, None))
    }

    fn touch(lru: &mut LruIndex<String, u32>, key: &str) {
        match lru.lookup(&key.to_string()) {
            Some(slot) => lru.move_to_front(slot),
            None => {
                insert(lru, key);
            }
        }
    }

    fn keys(lru: &LruIndex<String, u32>) -> Vec<&str> {
        lru.iter().map(|entry| entry.key.as_str()).collect()
    }

    fn evict(lru: &mut LruIndex<String, u32>) -> Option<String> {
        lru.remove_back().map(|entry| entry.key)
    }

    #[test]
    fn test_lru_new() {
        let lru: LruIndex<String, u32> = LruIndex::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert!(lru.iter().next().is_none());
    }

    #[test]
    fn test_lru_push_front_orders_newest_first() {
        let mut lru = LruIndex::new();

        insert(&mut lru, "key1");
        insert(&mut lru, "key2");
        insert(&mut lru, "key3");

        assert_eq!(lru.len(), 3);
        assert_eq!(keys(&lru), vec!["key3", "key2", "key1"]);
    }

    #[test]
    fn test_lru_move_to_front() {
        let mut lru = LruIndex::new();

        let key1 = insert(&mut lru, "key1");
        insert(&mut lru, "key2");
        insert(&mut lru, "key3");

        lru.move_to_front(key1);

        assert_eq!(lru.len(), 3);
        assert_eq!(keys(&lru), vec!["key1", "key3", "key2"]);
        assert_eq!(evict(&mut lru), Some("key2".to_string()));
    }

    #[test]
    fn test_lru_move_head_to_front_is_noop() {
        let mut lru = LruIndex::new();

        insert(&mut lru, "a");
        let b = insert(&mut lru, "b");
        lru.move_to_front(b);

        assert_eq!(keys(&lru), vec!["b", "a"]);
    }

    #[test]
    fn test_lru_remove_back() {
        let mut lru = LruIndex::new();

        insert(&mut lru, "key1");
        insert(&mut lru, "key2");
        insert(&mut lru, "key3");

        assert_eq!(evict(&mut lru), Some("key1".to_string()));
        assert_eq!(lru.len(), 2);

        assert_eq!(evict(&mut lru), Some("key2".to_string()));
        assert_eq!(lru.len(), 1);
        assert!(lru.lookup(&"key1".to_string()).is_none());
    }

    #[test]
    fn test_lru_remove_back_empty() {
        let mut lru: LruIndex<String, u32> = LruIndex::new();
        assert!(lru.remove_back().is_none());
    }

    #[test]
    fn test_lru_remove_middle() {
        let mut lru = LruIndex::new();

        insert(&mut lru, "key1");
        let key2 = insert(&mut lru, "key2");
        insert(&mut lru, "key3");

        let removed = lru.remove(key2).unwrap();
        assert_eq!(removed.key, "key2");

        assert_eq!(lru.len(), 2);
        assert!(lru.lookup(&"key2".to_string()).is_none());
        assert_eq!(keys(&lru), vec!["key3", "key1"]);
    }

    #[test]
    fn test_lru_remove_twice_is_noop() {
        let mut lru = LruIndex::new();

        let key1 = insert(&mut lru, "key1");
        insert(&mut lru, "key2");

        assert!(lru.remove(key1).is_some());
        assert!(lru.remove(key1).is_none());
        assert_eq!(keys(&lru), vec!["key2"]);
    }

    #[test]
    fn test_lru_slots_are_recycled() {
        let mut lru = LruIndex::new();

        let a = insert(&mut lru, "a");
        lru.remove(a);
        let b = insert(&mut lru, "b");

        assert_eq!(a, b);
        assert_eq!(lru.slots.len(), 1);
        assert_eq!(lru.get(&"b".to_string()).map(|(_, e)| e.key.as_str()), Some("b"));
    }

    #[test]
    fn test_lru_get_mut_updates_value() {
        let mut lru = LruIndex::new();
        insert(&mut lru, "a");

        if let Some((_, entry)) = lru.get_mut(&"a".to_string()) {
            entry.value = 7;
        }

        assert_eq!(lru.get(&"a".to_string()).map(|(_, e)| e.value), Some(7));
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruIndex::new();

        touch(&mut lru, "a");
        touch(&mut lru, "b");
        touch(&mut lru, "c");

        touch(&mut lru, "a");
        touch(&mut lru, "c");
        touch(&mut lru, "b");

        // front=[b, c, a]=back
        assert_eq!(evict(&mut lru), Some("a".to_string()));
        assert_eq!(evict(&mut lru), Some("c".to_string()));
        assert_eq!(evict(&mut lru), Some("b".to_string()));
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_clear() {
        let mut lru = LruIndex::new();

        insert(&mut lru, "a");
        insert(&mut lru, "b");
        lru.clear();

        assert!(lru.is_empty());
        assert!(lru.iter().next().is_none());
        assert!(lru.remove_back().is_none());

        insert(&mut lru, "c");
        assert_eq!(keys(&lru), vec!["c"]);
    }
}
