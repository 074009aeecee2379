//! Eviction Order Module
//!
//! Key index plus recency ordering for all live entries.
//!
//! Entries live in an arena of slots addressed by stable indices, linked
//! into a doubly-linked list through `prev`/`next` slot indices:
//! - Front (head) = most recently used
//! - Back (tail) = next eviction victim
//!
//! A `HashMap<K, usize>` maps each key to its slot, so insert, promote,
//! demote and remove are all O(1). Freed slots are recycled through a free
//! list threaded over `next`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::cache::entry::CacheEntry;

/// Null link.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    entry: Option<CacheEntry<K, V>>,
    prev: usize,
    next: usize,
}

// == Eviction Order ==
/// Index and eviction order over the cache entries.
///
/// Invariant: a key is in `index` iff its slot is linked into the list, and
/// `len()` equals the number of linked slots.
#[derive(Debug)]
pub(crate) struct EvictionOrder<K, V> {
    /// Key -> slot
    index: HashMap<K, usize>,
    /// Slot arena
    nodes: Vec<Node<K, V>>,
    head: usize,
    tail: usize,
    /// Head of the free-slot list
    free: usize,
}

impl<K, V> EvictionOrder<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty order with room for `capacity` entries.
    ///
    /// One extra slot is reserved since an insert into a full cache briefly
    /// holds `capacity + 1` entries before the victim is popped.
    pub fn with_capacity(capacity: usize) -> Self {
        let reserve = capacity.saturating_add(1);
        Self {
            index: HashMap::with_capacity(reserve),
            nodes: Vec::with_capacity(reserve),
            head: NIL,
            tail: NIL,
            free: NIL,
        }
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Lookups ==
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    #[cfg(test)]
    pub fn get<Q>(&self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.nodes[slot].entry.as_ref()
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.nodes[slot].entry.as_mut()
    }

    // == Insert At Front ==
    /// Inserts a new entry as most recently used.
    ///
    /// Fails, handing the entry back, if its key is already present.
    pub fn insert_front(&mut self, entry: CacheEntry<K, V>) -> Result<(), CacheEntry<K, V>> {
        if self.index.contains_key(&entry.key) {
            return Err(entry);
        }

        let key = entry.key.clone();
        let slot = self.alloc(entry);
        self.link_front(slot);
        self.index.insert(key, slot);
        Ok(())
    }

    // == Promote ==
    /// Moves an entry to the front without touching its payload.
    pub fn promote<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&slot) => {
                self.promote_slot(slot);
                true
            }
            None => false,
        }
    }

    // == Demote ==
    /// Moves an entry to the back without touching its payload.
    pub fn demote<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&slot) => {
                self.demote_slot(slot);
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes an entry from both index and order.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.index.remove(key)?;
        self.release(slot)
    }

    // == Pop Back ==
    /// Removes and returns the back-most entry (the eviction victim).
    pub fn pop_back(&mut self) -> Option<CacheEntry<K, V>> {
        if self.tail == NIL {
            return None;
        }
        let entry = self.release(self.tail)?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    // == Back Key ==
    /// Returns the key that would be evicted next.
    #[cfg(test)]
    pub fn back_key(&self) -> Option<&K> {
        if self.tail == NIL {
            return None;
        }
        self.nodes[self.tail].entry.as_ref().map(|entry| &entry.key)
    }

    // == Iteration ==
    /// Walks linked slots from front to back.
    pub fn slots(&self) -> Slots<'_, K, V> {
        Slots {
            nodes: &self.nodes,
            current: self.head,
        }
    }

    /// Keys from front (most recent) to back (next victim).
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.slots().map(|(_, entry)| &entry.key)
    }

    // == Slot Operations ==
    // Slot indices stay valid across promote/demote; only removal frees a slot.

    pub fn entry_at_mut(&mut self, slot: usize) -> Option<&mut CacheEntry<K, V>> {
        self.nodes.get_mut(slot).and_then(|node| node.entry.as_mut())
    }

    pub fn promote_slot(&mut self, slot: usize) {
        if self.head == slot {
            return;
        }
        self.unlink(slot);
        self.link_front(slot);
    }

    pub fn demote_slot(&mut self, slot: usize) {
        if self.tail == slot {
            return;
        }
        self.unlink(slot);
        self.link_back(slot);
    }

    // == Internal List Operations ==

    fn alloc(&mut self, entry: CacheEntry<K, V>) -> usize {
        let node = Node {
            entry: Some(entry),
            prev: NIL,
            next: NIL,
        };

        if self.free != NIL {
            let slot = self.free;
            self.free = self.nodes[slot].next;
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    /// Unlinks a slot and pushes it onto the free list.
    fn release(&mut self, slot: usize) -> Option<CacheEntry<K, V>> {
        self.unlink(slot);
        let node = &mut self.nodes[slot];
        let entry = node.entry.take();
        node.next = self.free;
        self.free = slot;
        entry
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = NIL;
    }

    fn link_front(&mut self, slot: usize) {
        self.nodes[slot].prev = NIL;
        self.nodes[slot].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = slot;
        } else {
            self.tail = slot;
        }
        self.head = slot;
    }

    fn link_back(&mut self, slot: usize) {
        self.nodes[slot].next = NIL;
        self.nodes[slot].prev = self.tail;
        if self.tail != NIL {
            self.nodes[self.tail].next = slot;
        } else {
            self.head = slot;
        }
        self.tail = slot;
    }
}

// == Slot Iterator ==
/// Front-to-back iterator over `(slot, entry)` pairs.
pub(crate) struct Slots<'a, K, V> {
    nodes: &'a [Node<K, V>],
    current: usize,
}

impl<'a, K, V> Iterator for Slots<'a, K, V> {
    type Item = (usize, &'a CacheEntry<K, V>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NIL {
            return None;
        }
        let slot = self.current;
        let node = &self.nodes[slot];
        self.current = node.next;
        node.entry.as_ref().map(|entry| (slot, entry))
    }
}
