use std::{fmt, sync::{atomic::{AtomicIsize, Ordering}, Arc}};

use crossbeam_epoch::{pin, unprotected, Guard, Owned, Shared};

use crate::node::Node;

struct Anchor<K> {
    head: Node<K>,
    length: AtomicIsize,
}

impl<K> Drop for Anchor<K> {
    fn drop(&mut self) {
        // Last handle is gone, nobody else can be walking the chain.
        let g = unsafe { unprotected() };
        let mut cur = self.head.load_next(g);
        while !cur.is_null() {
            let node = unsafe { cur.into_owned() };
            cur = node.load_next(g);
            drop(node);
        }
    }
}

/// Concurrent ordered set of unique keys.
///
/// Lookups and traversals never lock. `insert` locks the predecessor of the
/// new key, `remove` locks the victim and then its predecessor, so writers on
/// disjoint parts of the list run in parallel.
///
/// Cloning yields another handle to the same set.
pub struct OrderedSet<K> {
    anchor: Arc<Anchor<K>>,
}

impl<K> Clone for OrderedSet<K> {
    fn clone(&self) -> Self {
        Self { anchor: Arc::clone(&self.anchor) }
    }
}

impl<K> Default for OrderedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> OrderedSet<K> {
    pub fn new() -> Self {
        let anchor = Anchor { head: Node::sentinel(), length: AtomicIsize::new(0) };
        Self { anchor: anchor.into() }
    }

    /// Net count of completed inserts and removes. Approximate while writers
    /// are running.
    pub fn len(&self) -> usize {
        // An insert bumps the counter after unlocking, so a racing remove of
        // the same key can briefly drive it below zero.
        self.anchor.length.load(Ordering::Relaxed).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walks the live keys in ascending order without taking any lock.
    ///
    /// Weakly consistent: keys inserted or removed during the walk may or may
    /// not show up, but a key present for the whole walk is always yielded.
    pub fn iter<'g>(&'g self, g: &'g Guard) -> Iter<'g, K> {
        Iter { cur: self.anchor.head.load_next(g), g }
    }
}

/// Where `find` stopped: `prev` is the last node below the key (possibly the
/// head), `cur` the first node at or above it.
struct Position<'g, K> {
    prev: &'g Node<K>,
    cur: Shared<'g, Node<K>>,
    exists: bool,
}

impl<'g, K> Position<'g, K> {
    /// The node holding the key, marked or not.
    fn found(&self) -> Option<&'g Node<K>> {
        if self.exists {
            unsafe { self.cur.as_ref() }
        } else {
            None
        }
    }

    /// Caller holds `prev.lock`.
    fn is_valid(&self, g: &Guard) -> bool {
        self.prev.load_next(g) == self.cur && !self.prev.is_marked()
    }
}

impl<K: Ord> OrderedSet<K> {
    /// Lock-free. Ignores marks: it only answers where `key` belongs.
    fn find<'g>(&'g self, key: &K, g: &'g Guard) -> Position<'g, K> {
        let mut prev = &self.anchor.head;
        let mut cur = prev.load_next(g);
        // SAFETY: nodes are retired with `defer_destroy` only, and `g` is pinned.
        while let Some(node) = unsafe { cur.as_ref() } {
            if node.key.as_ref() >= Some(key) {
                break;
            }
            prev = node;
            cur = node.load_next(g);
        }
        let exists = unsafe { cur.as_ref() }.is_some_and(|n| n.key.as_ref() == Some(key));
        Position { prev, cur, exists }
    }

    pub fn contains(&self, key: &K) -> bool {
        let g = &pin();
        match self.find(key, g).found() {
            Some(node) => !node.is_marked(),
            None => false,
        }
    }

    /// Returns `false` if the key is already present.
    pub fn insert(&self, key: K) -> bool {
        let g = &pin();
        'try_insert: loop {
            let pos = self.find(&key, g);
            let existing = pos.found();
            if existing.is_some_and(|n| !n.is_marked()) {
                return false;
            }
            let prev_lock = pos.prev.lock.lock();
            if existing.is_some() {
                // Marked nodes are unlinked while their remover holds the
                // predecessor's lock, so once we get it the node is gone.
                #[cfg(feature = "tracing")]
                tracing::trace!("insert: waited out a marked node; searching again");
                continue 'try_insert;
            }
            if !pos.is_valid(g) {
                #[cfg(feature = "tracing")]
                tracing::trace!(prev_marked = pos.prev.is_marked(), "insert: predecessor changed; retrying");
                continue 'try_insert;
            }
            let new_node = Owned::new(Node::new(key));
            new_node.store_next(pos.cur);
            debug_assert!(unsafe { pos.cur.as_ref() }.map_or(true, |n| n.key > new_node.key));
            pos.prev.store_next(new_node.into_shared(g));
            drop(prev_lock);
            self.anchor.length.fetch_add(1, Ordering::Relaxed);
            return true;
        }
    }

    /// Calls `visit` on each live key in ascending order until it returns
    /// `false`. Same consistency as [`OrderedSet::iter`].
    pub fn range<F: FnMut(&K) -> bool>(&self, mut visit: F) {
        let g = &pin();
        for key in self.iter(g) {
            if !visit(key) {
                break;
            }
        }
    }
}

// Removed nodes can be destroyed on whichever thread next advances the epoch,
// possibly after the set itself is gone.
impl<K: Ord + Send + 'static> OrderedSet<K> {
    /// Returns `false` if the key was absent.
    pub fn remove(&self, key: &K) -> bool {
        let g = &pin();
        'try_remove: loop {
            let pos = self.find(key, g);
            let cur = match pos.found() {
                Some(cur) => cur,
                None => return false,
            };
            // Always victim first, then predecessor: descending key order.
            let cur_lock = cur.lock.lock();
            if cur.is_marked() {
                #[cfg(feature = "tracing")]
                tracing::trace!("remove: lost race to another remove; searching again");
                continue 'try_remove;
            }
            let prev_lock = pos.prev.lock.lock();
            if !pos.is_valid(g) {
                #[cfg(feature = "tracing")]
                tracing::trace!(prev_marked = pos.prev.is_marked(), "remove: predecessor changed; retrying");
                drop(prev_lock);
                drop(cur_lock);
                continue 'try_remove;
            }
            cur.set_marked();
            pos.prev.store_next(cur.load_next(g));
            drop(prev_lock);
            drop(cur_lock);
            // SAFETY: unlinked above under both locks; only pinned readers can still reach it.
            unsafe { g.defer_destroy(pos.cur) };
            self.anchor.length.fetch_sub(1, Ordering::Relaxed);
            return true;
        }
    }
}

impl<K: Ord> Extend<K> for OrderedSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for OrderedSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K: fmt::Debug> fmt::Debug for OrderedSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &pin();
        f.debug_set().entries(self.iter(g)).finish()
    }
}

pub struct Iter<'g, K> {
    cur: Shared<'g, Node<K>>,
    g: &'g Guard,
}

impl<'g, K> Iterator for Iter<'g, K> {
    type Item = &'g K;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = unsafe { self.cur.as_ref() }?;
            // A marked node still points forward, so keep walking past it.
            self.cur = node.load_next(self.g);
            if !node.is_marked() {
                return node.key.as_ref();
            }
        }
    }
}
