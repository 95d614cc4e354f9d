//! The closed set of UI-element categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven fixed UI-element classes.
///
/// Declaration order is the fixed category order: it drives extraction
/// priority when a node matches more than one selector, and the order in
/// which category blocks appear in the combined feature document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Headings,
    Paragraphs,
    Links,
    Buttons,
    ImagesAndLogos,
    Icons,
    Forms,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Headings,
        Category::Paragraphs,
        Category::Links,
        Category::Buttons,
        Category::ImagesAndLogos,
        Category::Icons,
        Category::Forms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Headings => "headings",
            Category::Paragraphs => "paragraphs",
            Category::Links => "links",
            Category::Buttons => "buttons",
            Category::ImagesAndLogos => "images_and_logos",
            Category::Icons => "icons",
            Category::Forms => "forms",
        }
    }

    /// Title-cased name for display ("Images And Logos").
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown category '{}' (expected one of: {})",
            self.0,
            Category::ALL
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_config_spellings() {
        assert_eq!("headings".parse::<Category>(), Ok(Category::Headings));
        assert_eq!(
            "images-and-logos".parse::<Category>(),
            Ok(Category::ImagesAndLogos)
        );
        assert_eq!(" Forms ".parse::<Category>(), Ok(Category::Forms));
        assert!("inputs".parse::<Category>().is_err());
    }

    #[test]
    fn test_order_matches_declaration() {
        let mut shuffled = vec![Category::Forms, Category::Headings, Category::Links];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Category::Headings, Category::Links, Category::Forms]
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(Category::ImagesAndLogos.display_name(), "Images And Logos");
        assert_eq!(Category::Icons.display_name(), "Icons");
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&Category::ImagesAndLogos).unwrap();
        assert_eq!(json, "\"images_and_logos\"");
    }
}
