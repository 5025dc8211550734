//! Lifecycle hooks raised around catalog mutations.
//!
//! Hooks are explicit registration objects owned by the service that raises
//! them (no process-wide subscriber lists). A `before` hook may veto the
//! operation; an `after` hook is a notification only.

pub mod hooks;
pub mod phase;

pub use hooks::{AfterHook, BeforeHook, CancellableArgs, LifecycleHooks, NotifyArgs};
pub use phase::LifecyclePhase;
