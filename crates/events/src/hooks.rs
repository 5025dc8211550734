//! Before/after hook registry.
//!
//! ## Semantics
//!
//! - Every registered `before` hook for a phase runs, in registration order, on
//!   the calling thread. The veto is read once after all of them have run.
//! - `after` hooks receive the affected entities and cannot veto.
//! - Single-entity and batch operations use the same signature: hooks always
//!   see a slice (of length one for single-entity calls).

use chrono::{DateTime, Utc};

use crate::phase::LifecyclePhase;

/// Hook invoked before a mutation; may call [`CancellableArgs::cancel`].
pub type BeforeHook<T> = Box<dyn Fn(&mut CancellableArgs<'_, T>) + Send + Sync>;

/// Hook invoked after a mutation completed.
pub type AfterHook<T> = Box<dyn Fn(&NotifyArgs<'_, T>) + Send + Sync>;

/// Arguments passed to `before` hooks.
#[derive(Debug)]
pub struct CancellableArgs<'a, T> {
    phase: LifecyclePhase,
    entities: &'a [T],
    cancelled: bool,
}

impl<'a, T> CancellableArgs<'a, T> {
    pub fn new(phase: LifecyclePhase, entities: &'a [T]) -> Self {
        Self {
            phase,
            entities,
            cancelled: false,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn entities(&self) -> &'a [T] {
        self.entities
    }

    /// Veto the pending operation.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Arguments passed to `after` hooks.
#[derive(Debug)]
pub struct NotifyArgs<'a, T> {
    phase: LifecyclePhase,
    entities: &'a [T],
    occurred_at: DateTime<Utc>,
}

impl<'a, T> NotifyArgs<'a, T> {
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn entities(&self) -> &'a [T] {
        self.entities
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Registry of lifecycle hooks for entities of type `T`.
pub struct LifecycleHooks<T> {
    before: Vec<(LifecyclePhase, BeforeHook<T>)>,
    after: Vec<(LifecyclePhase, AfterHook<T>)>,
}

impl<T> LifecycleHooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cancellable hook for `phase`.
    pub fn before<F>(&mut self, phase: LifecyclePhase, hook: F) -> &mut Self
    where
        F: Fn(&mut CancellableArgs<'_, T>) + Send + Sync + 'static,
    {
        self.before.push((phase, Box::new(hook)));
        self
    }

    /// Register a notification hook for `phase`.
    pub fn after<F>(&mut self, phase: LifecyclePhase, hook: F) -> &mut Self
    where
        F: Fn(&NotifyArgs<'_, T>) + Send + Sync + 'static,
    {
        self.after.push((phase, Box::new(hook)));
        self
    }

    /// Raise the `before` hooks for `phase`. Returns `true` if any hook vetoed.
    pub fn raise_before(&self, phase: LifecyclePhase, entities: &[T]) -> bool {
        let mut args = CancellableArgs::new(phase, entities);
        for (_, hook) in self.before.iter().filter(|(p, _)| *p == phase) {
            hook(&mut args);
        }

        if args.is_cancelled() {
            tracing::info!(
                hook = phase.before_name(),
                entities = entities.len(),
                "operation cancelled by lifecycle hook"
            );
        }
        args.is_cancelled()
    }

    /// Raise the `after` hooks for `phase`.
    pub fn raise_after(&self, phase: LifecyclePhase, entities: &[T]) {
        let args = NotifyArgs {
            phase,
            entities,
            occurred_at: Utc::now(),
        };
        for (_, hook) in self.after.iter().filter(|(p, _)| *p == phase) {
            hook(&args);
        }
        tracing::debug!(hook = phase.after_name(), entities = entities.len(), "hooks notified");
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

impl<T> Default for LifecycleHooks<T> {
    fn default() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl<T> core::fmt::Debug for LifecycleHooks<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn no_hooks_never_cancels() {
        let hooks: LifecycleHooks<u32> = LifecycleHooks::new();
        assert!(!hooks.raise_before(LifecyclePhase::Save, &[1, 2]));
        assert!(hooks.is_empty());
    }

    #[test]
    fn veto_is_checked_after_every_before_hook_ran() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hooks: LifecycleHooks<u32> = LifecycleHooks::new();

        hooks.before(LifecyclePhase::Save, |args| args.cancel());
        let seen = calls.clone();
        hooks.before(LifecyclePhase::Save, move |args| {
            assert!(args.is_cancelled());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(hooks.raise_before(LifecyclePhase::Save, &[7]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hooks_only_fire_for_their_phase() {
        let saved = Arc::new(AtomicUsize::new(0));
        let mut hooks: LifecycleHooks<u32> = LifecycleHooks::new();

        hooks.before(LifecyclePhase::Delete, |args| args.cancel());
        let counter = saved.clone();
        hooks.after(LifecyclePhase::Save, move |args| {
            counter.fetch_add(args.entities().len(), Ordering::SeqCst);
        });

        assert!(!hooks.raise_before(LifecyclePhase::Save, &[1]));
        assert!(hooks.raise_before(LifecyclePhase::Delete, &[1]));

        hooks.raise_after(LifecyclePhase::Delete, &[1, 2, 3]);
        assert_eq!(saved.load(Ordering::SeqCst), 0);
        hooks.raise_after(LifecyclePhase::Save, &[1, 2, 3]);
        assert_eq!(saved.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn before_hooks_see_the_entities() {
        let mut hooks: LifecycleHooks<&'static str> = LifecycleHooks::new();
        hooks.before(LifecyclePhase::Create, |args| {
            if args.entities().iter().any(|name| name.is_empty()) {
                args.cancel();
            }
        });

        assert!(!hooks.raise_before(LifecyclePhase::Create, &["shirt"]));
        assert!(hooks.raise_before(LifecyclePhase::Create, &["shirt", ""]));
    }
}
