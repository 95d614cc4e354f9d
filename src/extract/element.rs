//! Extracted UI elements and the per-category inventory.

use super::category::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One extracted page element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiElement {
    pub category: Category,

    /// Lowercase tag name (e.g. "h2", "a", "svg")
    pub tag_name: String,

    /// Trimmed visible text, or an accessible-name fallback. May be empty.
    pub text_or_label: String,

    /// Category-relevant attributes, keyed by attribute name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Nested controls; only populated for forms
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<UiElement>,

    /// Context that tells this element apart from same-labelled siblings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<UniquenessContext>,
}

impl UiElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }
}

/// The context key that disambiguates an element, and its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniquenessContext {
    pub level: String,
    pub value: String,
}

/// Category → ordered elements, in document order, each sequence bounded by
/// the extraction cap. All seven categories are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedInventory {
    cap: usize,
    elements: BTreeMap<Category, Vec<UiElement>>,
}

impl CategorizedInventory {
    pub fn empty(cap: usize) -> Self {
        Self {
            cap,
            elements: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    pub fn get(&self, category: Category) -> &[UiElement] {
        self.elements
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, category: Category) -> usize {
        self.get(category).len()
    }

    pub fn is_full(&self, category: Category) -> bool {
        self.count(category) >= self.cap
    }

    /// Append in document order. Returns false (and drops the element) once
    /// the category has reached the cap.
    pub(crate) fn push(&mut self, element: UiElement) -> bool {
        let cap = self.cap;
        let slot = self.elements.entry(element.category).or_default();
        if slot.len() >= cap {
            return false;
        }
        slot.push(element);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[UiElement])> {
        self.elements.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.elements.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(text: &str) -> UiElement {
        UiElement {
            category: Category::Headings,
            tag_name: "h1".to_string(),
            text_or_label: text.to_string(),
            attributes: BTreeMap::new(),
            fields: vec![],
            context: None,
        }
    }

    #[test]
    fn test_empty_inventory_has_every_category() {
        let inventory = CategorizedInventory::empty(10);
        assert_eq!(inventory.iter().count(), 7);
        assert!(inventory.is_empty());
        for category in Category::ALL {
            assert!(inventory.get(category).is_empty());
        }
    }

    #[test]
    fn test_push_respects_cap() {
        let mut inventory = CategorizedInventory::empty(2);
        assert!(inventory.push(heading("a")));
        assert!(inventory.push(heading("b")));
        assert!(!inventory.push(heading("c")));
        assert_eq!(inventory.count(Category::Headings), 2);
        assert!(inventory.is_full(Category::Headings));
        assert_eq!(inventory.get(Category::Headings)[1].text_or_label, "b");
    }
}
