//! Process-wide mutation lock.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One reader/writer lock shared by every mutating catalog sequence.
///
/// The lock protects no data, so a guard poisoned by a panicking holder is
/// recovered rather than propagated. Not re-entrant: a thread holding
/// [`ConcurrencyGuard::write`] must not acquire it again.
#[derive(Debug, Default)]
pub struct ConcurrencyGuard {
    lock: RwLock<()>,
}

static SHARED: OnceLock<Arc<ConcurrencyGuard>> = OnceLock::new();

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn shared() -> Arc<Self> {
        SHARED.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Exclusive access, released when the guard drops.
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Shared access, for readers needing a consistent multi-lookup view.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }
}
