//! Component lists built once from factories.

use std::sync::{Arc, PoisonError, RwLock};

enum Slot<T> {
    Unbuilt,
    Built(Arc<[T]>),
    Cleared,
}

/// Ordered component list, materialized on first use.
///
/// Once cleared the registry stays empty: a disposed owner never rebuilds
/// its components.
pub(crate) struct LazyRegistry<T> {
    slot: RwLock<Slot<T>>,
}

impl<T> Default for LazyRegistry<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(Slot::Unbuilt),
        }
    }
}

impl<T: Clone> LazyRegistry<T> {
    /// Components, running `build` if this is the first access.
    pub(crate) fn get_or_build(&self, build: impl FnOnce() -> Vec<T>) -> Arc<[T]> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Built(items) => return Arc::clone(items),
            Slot::Cleared => return Arc::from(Vec::new()),
            Slot::Unbuilt => {}
        }
        // state is re-read under the write lock; a clear may have run in between
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            Slot::Built(items) => Arc::clone(items),
            Slot::Cleared => Arc::from(Vec::new()),
            Slot::Unbuilt => {
                let items: Arc<[T]> = Arc::from(build());
                *slot = Slot::Built(Arc::clone(&items));
                items
            }
        }
    }

    /// Drop every component and refuse to rebuild.
    pub(crate) fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Slot::Cleared;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn test_builds_once() {
        let registry = LazyRegistry::<u32>::default();
        let builds = AtomicUsize::new(0);
        for _ in 0..3 {
            let items = registry.get_or_build(|| {
                builds.fetch_add(1, Ordering::SeqCst);
                vec![1, 2]
            });
            assert_eq!(&*items, &[1, 2]);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_is_final() {
        let registry = LazyRegistry::<u32>::default();
        registry.get_or_build(|| vec![1]);
        registry.clear();
        registry.clear();
        assert!(registry.get_or_build(|| vec![1]).is_empty());
    }

    #[test]
    fn test_no_rebuild_after_concurrent_clear() {
        for _ in 0..200 {
            let registry = LazyRegistry::<u32>::default();
            let cleared = AtomicBool::new(false);
            let built_after_clear = AtomicBool::new(false);
            let barrier = Barrier::new(3);

            std::thread::scope(|scope| {
                for _ in 0..2 {
                    scope.spawn(|| {
                        barrier.wait();
                        registry.get_or_build(|| {
                            if cleared.load(Ordering::SeqCst) {
                                built_after_clear.store(true, Ordering::SeqCst);
                            }
                            vec![1]
                        });
                    });
                }
                scope.spawn(|| {
                    barrier.wait();
                    registry.clear();
                    cleared.store(true, Ordering::SeqCst);
                });
            });

            assert!(!built_after_clear.load(Ordering::SeqCst));
            assert!(registry.get_or_build(|| vec![1]).is_empty());
        }
    }
}
