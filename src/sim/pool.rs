//! Copy-on-write entity pools
//!
//! The render side may still be walking last frame's entities while the update
//! side spawns and removes. A pool hands out cheap [`Snapshot`]s (an `Arc` to
//! the current buffer); the first mutation after a snapshot was taken clones the
//! buffer, so readers always see a stable frame and removal never invalidates
//! an in-progress iteration.

use std::ops::Deref;
use std::sync::Arc;

/// Ordered pool with an optional population cap
#[derive(Debug, Clone)]
pub struct Pool<T> {
    items: Arc<Vec<T>>,
    cap: usize,
}

/// Immutable view of a pool at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    items: Arc<Vec<T>>,
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<T: Clone> Pool<T> {
    /// Pool that holds at most `cap` entries
    pub fn with_cap(cap: usize) -> Self {
        Self {
            items: Arc::new(Vec::new()),
            cap,
        }
    }

    /// Pool without a population cap
    pub fn unbounded() -> Self {
        Self::with_cap(usize::MAX)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// True if another entity may be added
    #[inline]
    pub fn has_room(&self) -> bool {
        self.items.len() < self.cap
    }

    /// Add an entity if under the cap. Returns false when full.
    pub fn push(&mut self, item: T) -> bool {
        if !self.has_room() {
            return false;
        }
        Arc::make_mut(&mut self.items).push(item);
        true
    }

    /// Keep only entities matching the predicate. Returns how many were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        // Avoid a copy-on-write clone when nothing would be removed
        if self.items.iter().all(&mut keep) {
            return 0;
        }
        let items = Arc::make_mut(&mut self.items);
        let before = items.len();
        items.retain(|item| keep(item));
        before - items.len()
    }

    /// Remove entities matching the predicate, returning them in order
    pub fn drain_where<F>(&mut self, mut remove: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        if !self.items.iter().any(&mut remove) {
            return Vec::new();
        }
        let items = Arc::make_mut(&mut self.items);
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            if remove(&item) {
                removed.push(item);
            } else {
                kept.push(item);
            }
        }
        *items = kept;
        removed
    }

    /// Mutable access to every entity (clones the buffer if a snapshot is alive)
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        Arc::make_mut(&mut self.items).iter_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items = Arc::new(Vec::new());
        }
    }

    /// Stable view of the current contents
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            items: Arc::clone(&self.items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_respects_cap() {
        let mut pool = Pool::with_cap(2);
        assert!(pool.push(1));
        assert!(pool.push(2));
        assert!(!pool.push(3));
        assert_eq!(pool.len(), 2);
        assert!(!pool.has_room());
    }

    #[test]
    fn test_snapshot_survives_mutation() {
        let mut pool = Pool::unbounded();
        pool.push(1);
        pool.push(2);
        pool.push(3);

        let snapshot = pool.snapshot();
        pool.retain(|&v| v != 2);
        pool.push(4);
        for v in pool.iter_mut() {
            *v *= 10;
        }

        assert_eq!(&*snapshot, &[1, 2, 3]);
        assert_eq!(pool.iter().copied().collect::<Vec<_>>(), vec![10, 30, 40]);
    }

    #[test]
    fn test_removal_while_iterating_snapshot() {
        let mut pool = Pool::unbounded();
        for v in 0..5 {
            pool.push(v);
        }

        let mut seen = Vec::new();
        for &v in pool.snapshot().iter() {
            seen.push(v);
            pool.retain(|&other| other != v);
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_snapshot_read_on_another_thread() {
        let mut pool = Pool::unbounded();
        for v in 0..100 {
            pool.push(v);
        }

        let snapshot = pool.snapshot();
        let reader = std::thread::spawn(move || snapshot.iter().sum::<i32>());

        pool.retain(|&v| v % 2 == 0);
        for v in 100..150 {
            pool.push(v);
        }

        assert_eq!(reader.join().unwrap(), (0..100).sum::<i32>());
        assert_eq!(pool.len(), 100);
    }

    #[test]
    fn test_drain_where_keeps_order() {
        let mut pool = Pool::unbounded();
        for v in 0..6 {
            pool.push(v);
        }
        let removed = pool.drain_where(|v| v % 2 == 0);
        assert_eq!(removed, vec![0, 2, 4]);
        assert_eq!(pool.iter().copied().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_retain_without_removal_shares_buffer() {
        let mut pool = Pool::unbounded();
        pool.push(7);
        let snapshot = pool.snapshot();
        assert_eq!(pool.retain(|_| true), 0);
        assert!(Arc::ptr_eq(&snapshot.items, &pool.snapshot().items));
    }
}
