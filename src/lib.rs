//! A concurrent ordered set built on a singly linked list with per-node locks.
//!
//! Membership tests and traversals are lock-free. Writers find their spot
//! without locking, then lock only the edge they change and re-validate it,
//! starting over if another writer got there first. Removal marks a node
//! before unlinking it, so a reader that is already standing on it never sees
//! it as present. Unlinked nodes are reclaimed through `crossbeam-epoch`.
//!
//! ```
//! use lock_coupled_set::OrderedSet;
//!
//! let set = OrderedSet::new();
//! set.insert(5);
//! set.insert(3);
//! set.insert(8);
//! assert!(set.remove(&5));
//!
//! let mut keys = vec![];
//! set.range(|k| {
//!     keys.push(*k);
//!     true
//! });
//! assert_eq!(keys, [3, 8]);
//! assert_eq!(set.len(), 2);
//! ```
//!
//! # Cargo features
//!
//! - `tracing` (off by default): emits `tracing::trace!` events whenever an
//!   insert or remove has to search again after losing a race.

mod node;
pub mod set;

pub use set::{Iter, OrderedSet};
