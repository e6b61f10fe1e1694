//! A value derived from other state, recomputed only after it was invalidated.
//!
//! [`Cached`] is the single invalidation policy used by everything in the crate
//! that derives matrices: [`Transform`](crate::Transform) for its world
//! matrices, [`Camera`](crate::Camera) for view and projection, and the shadow
//! pass for its light-space matrices. Owners call [`Cached::invalidate`] from
//! every mutator and read through [`Cached::get_or_update`], so a read can never
//! observe a value older than the last mutation.

/// A cached derived value guarded by a dirty flag.
#[derive(Clone, Copy, Debug)]
pub struct Cached<T> {
    value: T,
    dirty: bool,
}

impl<T: Copy> Cached<T> {
    /// Creates a cache that already holds a valid value.
    pub fn new(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    /// Creates a cache whose placeholder value must be recomputed before use.
    pub fn stale(placeholder: T) -> Self {
        Self {
            value: placeholder,
            dirty: true,
        }
    }

    /// Marks the value as out of date.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Returns true if the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the cached value, recomputing it first if it is dirty.
    pub fn get_or_update(&mut self, compute: impl FnOnce() -> T) -> T {
        if self.dirty {
            self.value = compute();
            self.dirty = false;
        }
        self.value
    }

    /// Replaces the value and marks it clean.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_cache_skips_compute() {
        let mut cache = Cached::new(1);
        let value = cache.get_or_update(|| panic!("should not recompute"));
        assert_eq!(value, 1);
    }

    #[test]
    fn invalidated_cache_recomputes_once() {
        let mut cache = Cached::new(1);
        cache.invalidate();
        assert!(cache.is_dirty());

        let mut calls = 0;
        let first = cache.get_or_update(|| {
            calls += 1;
            2
        });
        let second = cache.get_or_update(|| {
            calls += 1;
            3
        });

        assert_eq!(first, 2);
        assert_eq!(second, 2);
        assert_eq!(calls, 1);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn stale_cache_starts_dirty() {
        let mut cache = Cached::stale(0.0f32);
        assert!(cache.is_dirty());
        assert_eq!(cache.get_or_update(|| 4.5), 4.5);
    }
}
