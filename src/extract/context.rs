//! Uniqueness context for same-labelled elements.
//!
//! Pages often repeat the same label ("Read more", "Learn more", a logo alt
//! text). Before an inventory is handed to the generator, every group of
//! elements sharing a primary label is split using an ordered hierarchy of
//! context keys, and the first key that isolates an element is attached to it.

use super::category::Category;
use super::element::{UiElement, UniquenessContext};
use std::collections::BTreeMap;

/// Context values observed for an element during extraction, keyed by the
/// names used in the hierarchies below.
pub(crate) type ContextFacts = BTreeMap<&'static str, String>;

/// Ordered context keys tried for each category.
pub(crate) fn hierarchy(category: Category) -> &'static [&'static str] {
    match category {
        Category::Headings => &[
            "id",
            "parent.id",
            "sibling_text",
            "parent_classes",
            "parent_description",
            "classes",
        ],
        Category::Paragraphs => &[
            "id",
            "parent.id",
            "parent_classes",
            "sibling_text",
            "parent_description",
            "classes",
        ],
        Category::Links => &[
            "id",
            "aria_label",
            "href",
            "parent.id",
            "parent_classes",
            "sibling_text",
            "classes",
        ],
        Category::Buttons => &[
            "id",
            "name",
            "type",
            "parent.id",
            "sibling_text",
            "parent_classes",
            "parent_description",
            "classes",
        ],
        Category::ImagesAndLogos => &[
            "id",
            "src",
            "parent.id",
            "sibling_text",
            "parent_classes",
            "parent_description",
            "classes",
        ],
        Category::Icons => &[
            "title",
            "parent.id",
            "sibling_text",
            "parent_description",
            "classes",
        ],
        // Forms carry their own identifier.
        Category::Forms => &[],
    }
}

fn primary_key(element: &UiElement) -> String {
    match element.category {
        Category::ImagesAndLogos => element.attr("alt").unwrap_or_default().to_string(),
        Category::Icons => element
            .attr("aria-label")
            .map(str::to_string)
            .unwrap_or_else(|| element.text_or_label.clone()),
        _ => element.text_or_label.clone(),
    }
}

/// Attach a `UniquenessContext` to elements whose primary label is shared.
///
/// An element isolated because it *lacks* a value the rest of its group has
/// is resolved without context. Elements that no key can isolate keep none.
pub(crate) fn disambiguate(category: Category, items: &mut [(UiElement, ContextFacts)]) {
    let keys = hierarchy(category);
    if keys.is_empty() {
        return;
    }

    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, (element, _)) in items.iter().enumerate() {
        groups.entry(primary_key(element)).or_default().push(index);
    }

    for (_, group) in groups {
        if group.len() < 2 {
            continue;
        }

        let mut ambiguous = group;
        for key in keys {
            if ambiguous.is_empty() {
                break;
            }

            let mut by_value: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
            for &index in &ambiguous {
                let value = items[index].1.get(key).cloned();
                by_value.entry(value).or_default().push(index);
            }

            let mut still_ambiguous = Vec::new();
            for (value, subgroup) in by_value {
                if subgroup.len() == 1 {
                    if let Some(value) = value {
                        items[subgroup[0]].0.context = Some(UniquenessContext {
                            level: key.to_string(),
                            value,
                        });
                    }
                } else {
                    still_ambiguous.extend(subgroup);
                }
            }
            still_ambiguous.sort_unstable();
            ambiguous = still_ambiguous;
        }
    }
}

/// Reduce an href to the part that usually tells two links apart: the path,
/// without scheme, host, query string or trailing slash.
pub(crate) fn href_path(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    let without_scheme = href.rsplit("//").next().unwrap_or(href);
    let path = match without_scheme.split_once('/') {
        Some((_, rest)) if href.contains("//") => rest,
        _ => without_scheme,
    };
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}
