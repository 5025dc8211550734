use serde::{Deserialize, Serialize};

use merchant_core::{ChoiceKey, Entity, OptionKey};

/// Derive a sku from a display name by dropping every character that is not
/// an ASCII letter or digit (`"Extra Large!"` → `"ExtraLarge"`).
pub fn derive_sku(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// One choice along an option's axis ("Red", "Large").
///
/// Owned by a [`ProductOption`]; variants hold snapshot copies in their
/// attribute tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttribute {
    key: Option<ChoiceKey>,
    pub name: String,
    pub sku: String,
    pub option_key: Option<OptionKey>,
    pub sort_order: i32,
}

impl ProductAttribute {
    /// New, not yet persisted choice. An empty `sku` is derived from `name`.
    pub fn new(name: impl Into<String>, sku: impl Into<String>) -> Self {
        let name = name.into();
        let mut sku = sku.into();
        if sku.is_empty() {
            sku = derive_sku(&name);
        }
        Self {
            key: None,
            name,
            sku,
            option_key: None,
            sort_order: 0,
        }
    }

    pub fn with_key(mut self, key: ChoiceKey) -> Self {
        self.key = Some(key);
        self
    }

    pub fn set_key(&mut self, key: ChoiceKey) {
        self.key = Some(key);
    }

    /// Whether `other` denotes the same choice.
    ///
    /// Keyed choices compare by key. A choice without persisted identity falls
    /// back to its owning option and sku.
    pub fn same_choice(&self, other: &ProductAttribute) -> bool {
        match (self.key, other.key) {
            (Some(a), Some(b)) => a == b,
            _ => self.option_key == other.option_key && self.sku == other.sku,
        }
    }
}

impl Entity for ProductAttribute {
    type Key = ChoiceKey;

    fn key(&self) -> Option<ChoiceKey> {
        self.key
    }
}

/// A named axis of product configurability ("Color").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    key: Option<OptionKey>,
    pub name: String,
    pub required: bool,
    pub sort_order: i32,
    choices: Vec<ProductAttribute>,
}

impl ProductOption {
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            key: None,
            name: name.into(),
            required,
            sort_order: 0,
            choices: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: OptionKey) -> Self {
        self.set_key(key);
        self
    }

    /// Builder form of [`ProductOption::add_choice`].
    pub fn with_choice(mut self, choice: ProductAttribute) -> Self {
        self.add_choice(choice);
        self
    }

    /// Assign the option key, propagating it to every owned choice.
    pub fn set_key(&mut self, key: OptionKey) {
        self.key = Some(key);
        for choice in &mut self.choices {
            choice.option_key = Some(key);
        }
    }

    pub fn choices(&self) -> &[ProductAttribute] {
        &self.choices
    }

    pub fn choices_mut(&mut self) -> &mut Vec<ProductAttribute> {
        &mut self.choices
    }

    pub fn choice(&self, key: ChoiceKey) -> Option<&ProductAttribute> {
        self.choices.iter().find(|c| c.key() == Some(key))
    }

    pub fn choice_by_sku(&self, sku: &str) -> Option<&ProductAttribute> {
        self.choices.iter().find(|c| c.sku == sku)
    }

    /// Append a choice. The choice is bound to this option and, when it has no
    /// explicit sort order, placed after the existing choices.
    pub fn add_choice(&mut self, mut choice: ProductAttribute) {
        choice.option_key = self.key;
        if choice.sort_order == 0 {
            choice.sort_order = self.choices.len() as i32 + 1;
        }
        self.choices.push(choice);
    }

    pub fn remove_choice(&mut self, key: ChoiceKey) -> Option<ProductAttribute> {
        let idx = self.choices.iter().position(|c| c.key() == Some(key))?;
        Some(self.choices.remove(idx))
    }

    /// Choices in sort order (stable for equal sort orders).
    pub fn sorted_choices(&self) -> Vec<&ProductAttribute> {
        let mut sorted: Vec<&ProductAttribute> = self.choices.iter().collect();
        sorted.sort_by_key(|c| c.sort_order);
        sorted
    }

    /// Whether `choice` belongs to this option.
    pub fn owns(&self, choice: &ProductAttribute) -> bool {
        self.choices.iter().any(|c| c.same_choice(choice))
    }
}

impl Entity for ProductOption {
    type Key = OptionKey;

    fn key(&self) -> Option<OptionKey> {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_sku_strips_non_alphanumerics() {
        assert_eq!(derive_sku("Extra Large!"), "ExtraLarge");
        assert_eq!(derive_sku("  x-l / 42 "), "xl42");
        assert_eq!(derive_sku("!!!"), "");
    }

    #[test]
    fn new_choice_derives_missing_sku() {
        let choice = ProductAttribute::new("Navy Blue", "");
        assert_eq!(choice.sku, "NavyBlue");

        let explicit = ProductAttribute::new("Navy Blue", "NB");
        assert_eq!(explicit.sku, "NB");
    }

    #[test]
    fn add_choice_binds_option_and_sort_order() {
        let key = OptionKey::new();
        let option = ProductOption::new("Size", true)
            .with_key(key)
            .with_choice(ProductAttribute::new("Small", "S"))
            .with_choice(ProductAttribute::new("Large", "L"));

        let orders: Vec<i32> = option.choices().iter().map(|c| c.sort_order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert!(option.choices().iter().all(|c| c.option_key == Some(key)));
    }

    #[test]
    fn set_key_propagates_to_choices() {
        let mut option = ProductOption::new("Color", false)
            .with_choice(ProductAttribute::new("Red", ""));
        assert_eq!(option.choices()[0].option_key, None);

        let key = OptionKey::new();
        option.set_key(key);
        assert_eq!(option.choices()[0].option_key, Some(key));
    }

    #[test]
    fn same_choice_prefers_keys_over_skus() {
        let key = ChoiceKey::new();
        let a = ProductAttribute::new("Red", "R").with_key(key);
        let mut b = ProductAttribute::new("Rouge", "RG").with_key(key);
        assert!(a.same_choice(&b));

        b.set_key(ChoiceKey::new());
        assert!(!a.same_choice(&b));

        let unkeyed = ProductAttribute::new("Red", "R");
        assert!(a.same_choice(&unkeyed));
    }

    #[test]
    fn sorted_choices_respects_sort_order() {
        let mut option = ProductOption::new("Size", true);
        let mut large = ProductAttribute::new("Large", "L");
        large.sort_order = 3;
        let mut small = ProductAttribute::new("Small", "S");
        small.sort_order = 1;
        option.add_choice(large);
        option.add_choice(small);

        let names: Vec<&str> = option.sorted_choices().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Small", "Large"]);
    }
}
