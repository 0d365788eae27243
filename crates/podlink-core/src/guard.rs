//! Timed locking for the shared directory and registry.
//!
//! Every access to either collection goes through [`Guarded::try_with_lock`],
//! which gives up after a fixed timeout instead of blocking. A caller that gets
//! `None` back makes no change and tries again on its next periodic pass.
//!
//! Lock order is registry, then directory. [`SharedState::both`] is the only
//! way to hold the two at once.

use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use podlink_metrics::metric_defs;
use tracing::trace;

use crate::directory::BoundedDirectory;
use crate::registry::BoundedRegistry;

/// A value behind a mutex that is only ever acquired with a timeout.
#[derive(Debug)]
pub struct Guarded<T> {
    name: &'static str,
    inner: Mutex<T>,
}

impl<T> Guarded<T> {
    /// Wrap `value`. `name` labels contention metrics and logs.
    pub fn new(name: &'static str, value: T) -> Self {
        Guarded {
            name,
            inner: Mutex::new(value),
        }
    }

    /// Try to acquire the lock, waiting at most `timeout`.
    pub fn try_with_lock(&self, timeout: Duration) -> Option<MutexGuard<'_, T>> {
        let guard = self.inner.try_lock_for(timeout);
        if guard.is_none() {
            trace!("Guard[{}]: lock not acquired within {:?}", self.name, timeout);
            metrics::counter!(metric_defs::LOCK_CONTENTION.name, "lock" => self.name).increment(1);
        }
        guard
    }
}

/// Registry and directory with their locks and the common timeout.
#[derive(Debug)]
pub struct SharedState {
    registry: Guarded<BoundedRegistry>,
    directory: Guarded<BoundedDirectory>,
    lock_timeout: Duration,
}

impl SharedState {
    /// Create empty collections guarded with `lock_timeout`.
    pub fn new(lock_timeout: Duration) -> Self {
        SharedState {
            registry: Guarded::new("registry", BoundedRegistry::new()),
            directory: Guarded::new("directory", BoundedDirectory::new()),
            lock_timeout,
        }
    }

    /// Start from an already populated registry.
    pub fn with_registry(lock_timeout: Duration, registry: BoundedRegistry) -> Self {
        SharedState {
            registry: Guarded::new("registry", registry),
            directory: Guarded::new("directory", BoundedDirectory::new()),
            lock_timeout,
        }
    }

    /// Timeout applied to every lock acquisition.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Lock the registry alone.
    pub fn registry(&self) -> Option<MutexGuard<'_, BoundedRegistry>> {
        self.registry.try_with_lock(self.lock_timeout)
    }

    /// Lock the directory alone.
    pub fn directory(&self) -> Option<MutexGuard<'_, BoundedDirectory>> {
        self.directory.try_with_lock(self.lock_timeout)
    }

    /// Lock registry then directory.
    ///
    /// If the directory times out the registry guard is dropped before
    /// returning, so a failed attempt never leaves a lock held.
    pub fn both(
        &self,
    ) -> Option<(MutexGuard<'_, BoundedRegistry>, MutexGuard<'_, BoundedDirectory>)> {
        let registry = self.registry()?;
        let directory = self.directory()?;
        Some((registry, directory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_try_with_lock_times_out_when_held() {
        let guarded = Arc::new(Guarded::new("test", 0u32));
        let held = guarded.try_with_lock(Duration::from_millis(10)).unwrap();

        let other = Arc::clone(&guarded);
        let result = thread::spawn(move || other.try_with_lock(Duration::from_millis(20)).is_some())
            .join()
            .unwrap();

        assert!(!result);
        drop(held);
        assert!(guarded.try_with_lock(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn test_both_releases_registry_when_directory_busy() {
        let state = Arc::new(SharedState::new(Duration::from_millis(20)));
        let directory = state.directory().unwrap();

        let other = Arc::clone(&state);
        let acquired = thread::spawn(move || other.both().is_some()).join().unwrap();
        assert!(!acquired);

        // The failed attempt must not have left the registry locked.
        let other = Arc::clone(&state);
        let registry_free = thread::spawn(move || other.registry().is_some())
            .join()
            .unwrap();
        assert!(registry_free);
        drop(directory);
        assert!(state.both().is_some());
    }

    #[test]
    fn test_mutation_visible_after_release() {
        let state = SharedState::new(Duration::from_millis(10));
        state.registry().unwrap().register(1, "POD1", 2).unwrap();
        assert_eq!(state.registry().unwrap().len(), 1);
        assert_eq!(state.lock_timeout(), Duration::from_millis(10));
    }
}
