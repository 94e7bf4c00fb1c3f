//! Compute-once cells for derived entity properties.

use parking_lot::Mutex;
use std::sync::OnceLock;

/// A compute-once cell for one expensive derived property.
///
/// The first successful factory result is stored for the lifetime of the
/// cell. A failing factory stores nothing, so the next call retries.
/// Concurrent first accesses are serialized by an init lock: the factory
/// runs once per successful initialization even under contention.
#[derive(Debug)]
pub struct FieldCache<T> {
    value: OnceLock<T>,
    init: Mutex<()>,
}

impl<T> FieldCache<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Returns the stored value, if any.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns true once a value has been stored.
    pub fn is_valid(&self) -> bool {
        self.value.get().is_some()
    }

    /// Returns the stored value, computing it first if the cell is empty.
    pub fn get_or_try_init<E, F>(&self, factory: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _guard = self.init.lock();
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let value = factory()?;
        Ok(self.value.get_or_init(|| value))
    }
}

impl<T> Default for FieldCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn computes_once() {
        let cache = FieldCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_init(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(vec![1, 2, 3])
                })
                .unwrap();
            assert_eq!(value, &vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_valid());
    }

    #[test]
    fn later_factories_are_ignored() {
        let cache = FieldCache::new();
        cache.get_or_try_init(|| Ok::<_, ()>("first")).unwrap();
        let value = cache.get_or_try_init(|| Ok::<_, ()>("second")).unwrap();
        assert_eq!(*value, "first");
    }

    #[test]
    fn failure_is_not_cached() {
        let cache = FieldCache::<u32>::new();

        let err = cache.get_or_try_init(|| Err("engine down"));
        assert_eq!(err, Err("engine down"));
        assert!(!cache.is_valid());
        assert!(cache.get().is_none());

        let value = cache.get_or_try_init(|| Ok::<_, &str>(7)).unwrap();
        assert_eq!(*value, 7);
    }

    #[test]
    fn concurrent_first_access_computes_once() {
        let cache = Arc::new(FieldCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    *cache
                        .get_or_try_init(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::yield_now();
                            Ok::<_, ()>(42u64)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
