//! Cartesian product of option choices.
//!
//! Options are visited in sort order and choices in sort order within each
//! option. Tuples are enumerated odometer-style: the last option varies
//! fastest. Generation is lazy; the iterator is `Clone`, so a sequence can be
//! restarted by cloning it before consumption (or by calling [`combinations`]
//! again).
//!
//! An empty option list yields nothing (the master variant represents the
//! product). An option with zero choices also yields nothing for the whole
//! product: such an option blocks variant generation rather than being
//! skipped.

use serde::{Deserialize, Serialize};

use crate::option::{ProductAttribute, ProductOption};

/// An owned attribute tuple: one choice per option, in option order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTuple(Vec<ProductAttribute>);

impl AttributeTuple {
    pub fn new(choices: Vec<ProductAttribute>) -> Self {
        Self(choices)
    }

    pub fn choices(&self) -> &[ProductAttribute] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_choices(self) -> Vec<ProductAttribute> {
        self.0
    }
}

impl<'a> From<Vec<&'a ProductAttribute>> for AttributeTuple {
    fn from(value: Vec<&'a ProductAttribute>) -> Self {
        Self(value.into_iter().cloned().collect())
    }
}

/// Lazy iterator over every attribute tuple of a set of options.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    axes: Vec<Vec<&'a ProductAttribute>>,
    odometer: Vec<usize>,
    exhausted: bool,
}

/// Enumerate every tuple formed by picking one choice per option.
pub fn combinations(options: &[ProductOption]) -> Combinations<'_> {
    let mut sorted: Vec<&ProductOption> = options.iter().collect();
    sorted.sort_by_key(|o| o.sort_order);

    let axes: Vec<Vec<&ProductAttribute>> = sorted.iter().map(|o| o.sorted_choices()).collect();
    let exhausted = axes.is_empty() || axes.iter().any(Vec::is_empty);

    Combinations {
        odometer: vec![0; axes.len()],
        axes,
        exhausted,
    }
}

/// Number of tuples [`combinations`] yields for `options`.
pub fn combination_count(options: &[ProductOption]) -> usize {
    if options.is_empty() {
        return 0;
    }
    options
        .iter()
        .map(|o| o.choices().len())
        .try_fold(1usize, usize::checked_mul)
        .unwrap_or(usize::MAX)
}

impl<'a> Combinations<'a> {
    fn advance(&mut self) {
        for axis in (0..self.odometer.len()).rev() {
            self.odometer[axis] += 1;
            if self.odometer[axis] < self.axes[axis].len() {
                return;
            }
            self.odometer[axis] = 0;
        }
        // Every digit rolled over.
        self.exhausted = true;
    }

    fn remaining(&self) -> usize {
        if self.exhausted {
            return 0;
        }
        // Position of the odometer counted from the end, in mixed radix.
        let mut consumed = 0usize;
        for (digit, axis) in self.odometer.iter().zip(&self.axes) {
            consumed = consumed.saturating_mul(axis.len()).saturating_add(*digit);
        }
        let total = self
            .axes
            .iter()
            .try_fold(1usize, |acc, axis| acc.checked_mul(axis.len()))
            .unwrap_or(usize::MAX);
        total.saturating_sub(consumed)
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Vec<&'a ProductAttribute>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let tuple = self
            .odometer
            .iter()
            .zip(&self.axes)
            .map(|(digit, axis)| axis[*digit])
            .collect();
        self.advance();
        Some(tuple)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}

impl core::iter::FusedIterator for Combinations<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use merchant_core::ChoiceKey;

    fn option(name: &str, sort_order: i32, choices: &[&str]) -> ProductOption {
        let mut option = ProductOption::new(name, true);
        option.sort_order = sort_order;
        for c in choices {
            option.add_choice(ProductAttribute::new(*c, "").with_key(ChoiceKey::new()));
        }
        option
    }

    fn names(tuple: &[&ProductAttribute]) -> Vec<String> {
        tuple.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn two_by_two_in_odometer_order() {
        let options = vec![option("O1", 1, &["A", "B"]), option("O2", 2, &["X", "Y"])];
        let tuples: Vec<Vec<String>> = combinations(&options).map(|t| names(&t)).collect();
        assert_eq!(
            tuples,
            vec![
                vec!["A", "X"],
                vec!["A", "Y"],
                vec!["B", "X"],
                vec!["B", "Y"],
            ]
        );
    }

    #[test]
    fn options_are_visited_in_sort_order() {
        let options = vec![option("Size", 2, &["S", "L"]), option("Color", 1, &["Red"])];
        let first = combinations(&options).next().unwrap();
        assert_eq!(names(&first), vec!["Red", "S"]);
    }

    #[test]
    fn no_options_yields_nothing() {
        assert_eq!(combinations(&[]).count(), 0);
        assert_eq!(combination_count(&[]), 0);
    }

    #[test]
    fn empty_option_blocks_every_tuple() {
        let options = vec![option("Color", 1, &["Red", "Blue"]), option("Size", 2, &[])];
        assert_eq!(combinations(&options).count(), 0);
        assert_eq!(combination_count(&options), 0);
    }

    #[test]
    fn clone_restarts_from_the_same_position() {
        let options = vec![option("O1", 1, &["A", "B", "C"])];
        let fresh = combinations(&options);
        let mut consumed = fresh.clone();
        consumed.next();
        assert_eq!(fresh.count(), 3);
        assert_eq!(consumed.count(), 2);
    }

    #[test]
    fn size_hint_tracks_remaining() {
        let options = vec![option("O1", 1, &["A", "B"]), option("O2", 2, &["X", "Y", "Z"])];
        let mut iter = combinations(&options);
        assert_eq!(iter.len(), 6);
        iter.next();
        iter.next();
        assert_eq!(iter.len(), 4);
        iter.by_ref().for_each(drop);
        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
    }

    #[test]
    fn attribute_tuple_owns_copies() {
        let options = vec![option("O1", 1, &["A"]), option("O2", 2, &["X"])];
        let tuple: AttributeTuple = combinations(&options).next().unwrap().into();
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.choices()[0].name, "A");
        assert_eq!(tuple.choices()[1].name, "X");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: tuple count is the product of choice counts, every
            /// tuple has one choice per option and no tuple repeats.
            #[test]
            fn cartesian_product_is_complete_and_unique(
                sizes in prop::collection::vec(0usize..5, 1..5)
            ) {
                let options: Vec<ProductOption> = sizes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| {
                        let labels: Vec<String> = (0..*n).map(|c| format!("c{i}_{c}")).collect();
                        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                        option(&format!("o{i}"), i as i32 + 1, &refs)
                    })
                    .collect();

                let expected: usize = sizes.iter().product();
                let tuples: Vec<Vec<&ProductAttribute>> = combinations(&options).collect();
                prop_assert_eq!(tuples.len(), expected);
                prop_assert_eq!(combination_count(&options), expected);

                let mut seen = HashSet::new();
                for tuple in &tuples {
                    prop_assert_eq!(tuple.len(), options.len());
                    for (choice, option) in tuple.iter().zip(&options) {
                        prop_assert!(option.owns(choice));
                    }
                    let keys: Vec<_> = tuple.iter().map(|c| c.sku.clone()).collect();
                    prop_assert!(seen.insert(keys));
                }
            }

            /// Property: enumeration is deterministic.
            #[test]
            fn enumeration_is_deterministic(sizes in prop::collection::vec(1usize..4, 1..4)) {
                let options: Vec<ProductOption> = sizes
                    .iter()
                    .enumerate()
                    .map(|(i, n)| {
                        let labels: Vec<String> = (0..*n).map(|c| format!("c{i}_{c}")).collect();
                        let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                        option(&format!("o{i}"), i as i32 + 1, &refs)
                    })
                    .collect();

                let first: Vec<Vec<String>> = combinations(&options).map(|t| names(&t)).collect();
                let second: Vec<Vec<String>> = combinations(&options).map(|t| names(&t)).collect();
                prop_assert_eq!(first, second);
            }
        }
    }
}
