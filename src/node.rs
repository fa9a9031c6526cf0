use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_epoch::{Atomic, Guard, Shared};
use parking_lot::Mutex;

/// A link in the ordered chain.
///
/// `next` and `marked` are read without the lock by every traversal; the lock
/// only serializes their transitions.
#[derive(Debug)]
pub(crate) struct Node<K> {
    // `None` is the sentinel. `Option` orders `None` below every `Some`, so the
    // head compares as -inf against any key.
    pub(crate) key: Option<K>,
    next: Atomic<Self>,
    marked: AtomicBool,
    pub(crate) lock: Mutex<()>,
}

impl<K> Node<K> {
    pub(crate) fn sentinel() -> Self {
        Self {
            key: None,
            next: Atomic::null(),
            marked: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn new(key: K) -> Self {
        Self { key: Some(key), ..Self::sentinel() }
    }

    pub(crate) fn load_next<'g>(&self, g: &'g Guard) -> Shared<'g, Self> {
        self.next.load(Ordering::Acquire, g)
    }

    /// Caller holds `self.lock`, or `self` has not been published yet.
    pub(crate) fn store_next(&self, next: Shared<'_, Self>) {
        self.next.store(next, Ordering::Release)
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    /// One-way. Caller holds `self.lock`.
    pub(crate) fn set_marked(&self) {
        debug_assert!(self.key.is_some(), "the sentinel is never deleted");
        self.marked.store(true, Ordering::Release)
    }
}
