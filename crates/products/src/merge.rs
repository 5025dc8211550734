//! Owned-collection merge.
//!
//! Applies a *desired* collection (detached copies from an inbound
//! representation) onto a *current* collection of owned entities:
//!
//! 1. **Deletion pass**: current elements whose persisted key is not in the
//!    desired key set are removed. Elements without persisted identity are
//!    never in that set.
//! 2. **Upsert pass**: a desired element whose key matches a current element
//!    is copied onto it *in place*; any other desired element is turned into a
//!    new child (or skipped, when the rules decline to build one).
//!
//! Nested owned collections are merged by calling [`merge_collection`] again
//! from inside [`MergeRules::update`] / [`MergeRules::create`].
//!
//! Identity is always the persisted key; object equality is never used.

use std::collections::HashSet;
use std::ops::AddAssign;

use merchant_core::Entity;

/// Identity and copy rules for one kind of owned child.
pub trait MergeRules<E: Entity> {
    /// Inbound element type.
    type Desired;

    /// Persisted key carried by the inbound element, if any.
    fn desired_key(&self, desired: &Self::Desired) -> Option<E::Key>;

    /// Copy fields from `desired` onto the existing `current` element.
    ///
    /// Returns a report of any nested merges performed.
    fn update(&self, desired: &Self::Desired, current: &mut E) -> MergeReport;

    /// Build a new child from `desired`, or `None` to skip it.
    fn create(&self, desired: &Self::Desired) -> Option<(E, MergeReport)>;
}

/// Counts of what a merge did (nested merges included).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub removed: usize,
    pub updated: usize,
    pub created: usize,
    pub skipped: usize,
}

impl MergeReport {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.created == 0
    }
}

impl AddAssign for MergeReport {
    fn add_assign(&mut self, rhs: Self) {
        self.removed += rhs.removed;
        self.updated += rhs.updated;
        self.created += rhs.created;
        self.skipped += rhs.skipped;
    }
}

/// Merge `desired` into `current` in place. See the module docs.
pub fn merge_collection<E, R>(current: &mut Vec<E>, desired: &[R::Desired], rules: &R) -> MergeReport
where
    E: Entity,
    R: MergeRules<E>,
{
    let mut report = MergeReport::default();

    // 1) Deletion pass.
    let wanted: HashSet<E::Key> = desired.iter().filter_map(|d| rules.desired_key(d)).collect();
    let before = current.len();
    current.retain(|e| e.key().is_some_and(|k| wanted.contains(&k)));
    report.removed = before - current.len();

    // 2) Upsert pass.
    for d in desired {
        let existing = rules
            .desired_key(d)
            .and_then(|k| current.iter().position(|e| e.key() == Some(k)));

        match existing {
            Some(idx) => {
                report.updated += 1;
                report += rules.update(d, &mut current[idx]);
            }
            None => match rules.create(d) {
                Some((entity, nested)) => {
                    report.created += 1;
                    report += nested;
                    current.push(entity);
                }
                None => report.skipped += 1,
            },
        }
    }

    report
}
