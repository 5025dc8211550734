//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// An entity without persisted identity returns `None` from [`Entity::key`].
/// Collection merges and reconciliation compare entities by key only, never
/// by value: two detached copies with the same key are the same entity.
pub trait Entity {
    /// Strongly-typed entity key.
    type Key: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the persisted key, if any.
    fn key(&self) -> Option<Self::Key>;

    fn has_identity(&self) -> bool {
        self.key().is_some()
    }
}
