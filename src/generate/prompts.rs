//! Prompt construction, one strategy per category.

use crate::extract::{Category, UiElement};
use serde_json::{json, Value};

/// How to ask for scenarios about one category of elements.
#[derive(Debug)]
pub struct PromptStrategy {
    /// Noun used for the elements in the prompt ("heading", "link", ...)
    pub noun: &'static str,
    /// Tag line every generated scenario must carry
    pub tags: &'static str,
    /// What each scenario has to verify
    pub instruction: &'static str,
    /// Category-specific step rules
    pub rules: &'static [&'static str],
    /// A sample snippet showing the expected shape
    pub example: &'static str,
}

static HEADINGS: PromptStrategy = PromptStrategy {
    noun: "heading",
    tags: "@heading @visibility",
    instruction: "Verify that each heading is present with its exact text and at the correct level (h1-h6).",
    rules: &[
        "Identify the heading by its id when present, otherwise by its text.",
        "Mention the level in the Then step, e.g. `as a level 2 heading`.",
    ],
    example: r#"  @heading @visibility
  Scenario: Verify visibility of the "Pricing" heading
    Then the user should see the level 2 heading "Pricing""#,
};

static PARAGRAPHS: PromptStrategy = PromptStrategy {
    noun: "paragraph",
    tags: "@paragraph @visibility @content",
    instruction: "Verify that each paragraph is visible, quoting the first few words of its text.",
    rules: &[
        "Use `Then the user should see the paragraph starting with \"SNIPPET...\"`.",
        "Keep snippets under about ten words.",
    ],
    example: r#"  @paragraph @visibility @content
  Scenario: Verify visibility of the paragraph starting with "We build tools..."
    Then the user should see the paragraph starting with "We build tools...""#,
};

static LINKS: PromptStrategy = PromptStrategy {
    noun: "link",
    tags: "@link @visibility @interaction",
    instruction: "Verify that each link is visible with a descriptive label and that clicking it leads to its non-empty destination.",
    rules: &[
        "Use the `href` value verbatim in the navigation step.",
        "Use `link_kind` to place the link: nav_item `in the navigation`, header_link `in the header`, footer_link `in the footer`, breadcrumb_item `in the breadcrumb`, social_link as a social media link.",
        "Skip links whose href is empty, `#` or `javascript:`.",
    ],
    example: r#"  @link @visibility @interaction
  Scenario: Verify navigation through the "Docs" link in the navigation
    Then the user should see the "Docs" link in the navigation
    When the user clicks the "Docs" link in the navigation
    Then the user should be navigated to the target page with URL "https://example.com/docs""#,
};

static BUTTONS: PromptStrategy = PromptStrategy {
    noun: "button",
    tags: "@button @visibility @interaction",
    instruction: "Verify that each button is visible and can be clicked.",
    rules: &[
        "Identify the button by id, then visible label, then name, then type.",
        "Write a Then step for visibility and a When step for the click.",
        "Mention when a button is disabled instead of clicking it.",
    ],
    example: r#"  @button @visibility @interaction
  Scenario: Verify interaction with the "Sign in" button
    Then the user should see the "Sign in" button
    When the user clicks the "Sign in" button"#,
};

static IMAGES_AND_LOGOS: PromptStrategy = PromptStrategy {
    noun: "image or logo",
    tags: "@image @visibility",
    instruction: "Verify that each image or logo is displayed, identified by its alt text or file name.",
    rules: &[
        "Prefer the alt text; fall back to the file name from `src`, then the id.",
        "Add the `@logo` tag and say `logo` in the title when `is_logo` is true.",
    ],
    example: r#"  @logo @image @visibility
  Scenario: Verify visibility of the Acme logo
    Then the user should see the image with alt text "Acme""#,
};

static ICONS: PromptStrategy = PromptStrategy {
    noun: "icon",
    tags: "@icon @visibility",
    instruction: "Verify that each icon is visible, identified by its accessible name.",
    rules: &[
        "Prefer aria-label, then title, then text, then describe the icon classes.",
    ],
    example: r#"  @icon @visibility
  Scenario: Verify visibility of the Search icon
    Then the user should see the icon identified by aria-label "Search""#,
};

static FORMS: PromptStrategy = PromptStrategy {
    noun: "form",
    tags: "@form @interaction",
    instruction: "For each form write a positive-path scenario that fills every field with valid data and submits it, plus one negative scenario that submits with a required field left empty.",
    rules: &[
        "Refer to the form by its label (`text_or_label`).",
        "Walk the `fields` in order; use the field label in each When step.",
        "Never invent fields that are not listed.",
    ],
    example: r#"  @form @interaction
  Scenario: Submit the login form with valid credentials
    Given the user sees the login form
    When the user enters a valid username in the "Username" field
    And the user enters a valid password in the "Password" field
    And the user clicks the "Sign in" button
    Then the form should be submitted successfully"#,
};

/// The dispatch table: exactly one strategy per category.
pub fn strategy(category: Category) -> &'static PromptStrategy {
    match category {
        Category::Headings => &HEADINGS,
        Category::Paragraphs => &PARAGRAPHS,
        Category::Links => &LINKS,
        Category::Buttons => &BUTTONS,
        Category::ImagesAndLogos => &IMAGES_AND_LOGOS,
        Category::Icons => &ICONS,
        Category::Forms => &FORMS,
    }
}

/// How a `UniquenessContext` level is phrased in a step.
const CONTEXT_PHRASES: &[(&str, &str)] = &[
    ("id", r#"identified by ID "VALUE""#),
    ("aria_label", r#"with aria-label "VALUE""#),
    ("href", r#"pointing to "VALUE""#),
    ("name", r#"named "VALUE""#),
    ("type", r#"of type "VALUE""#),
    ("src", r#"with source "VALUE""#),
    ("title", r#"with title "VALUE""#),
    ("parent.id", r#"within the element with ID "VALUE""#),
    ("parent_classes", r#"within an element with classes "VALUE""#),
    ("sibling_text", r#"next to the text "VALUE""#),
    ("parent_description", "within the VALUE"),
    ("classes", r#"with classes "VALUE""#),
];

fn element_json(element: &UiElement) -> Value {
    let mut value = json!({
        "tag": element.tag_name,
        "text_or_label": element.text_or_label,
    });
    if !element.attributes.is_empty() {
        value["attributes"] = json!(element.attributes);
    }
    if let Some(context) = &element.context {
        value["uniqueness_context"] = json!({ "level": context.level, "value": context.value });
    }
    if !element.fields.is_empty() {
        value["fields"] = Value::Array(element.fields.iter().map(element_json).collect());
    }
    value
}

/// Build the full prompt for one category's elements extracted from `url`.
pub fn build_category_prompt(category: Category, elements: &[UiElement], url: &str) -> String {
    let strategy = strategy(category);
    let data = Value::Array(elements.iter().map(element_json).collect());
    let data = serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string());

    let rules = strategy
        .rules
        .iter()
        .map(|r| format!("- {}", r))
        .collect::<Vec<_>>()
        .join("\n");

    let context_rules = CONTEXT_PHRASES
        .iter()
        .map(|(level, phrase)| format!("- `{}`: append ` {}`", level, phrase))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Based on the following {noun} elements extracted from {url}, generate one Gherkin scenario FOR EACH {noun} in the list.

Goal: {instruction}

Rules:
{rules}
- Tag every scenario with `{tags}`.
- Each element may carry a `uniqueness_context` because other elements share its label. When present, add it to the identifier in every step:
{context_rules}
- Write a short, user-friendly scenario title that reflects the final identifier.

Extracted elements ({count}):
{data}

Example:
{example}

Generate ONLY the Gherkin scenario snippets (tags and Scenario blocks). Do NOT include Feature or Background, and do not wrap the answer in code fences."#,
        noun = strategy.noun,
        url = url,
        instruction = strategy.instruction,
        rules = rules,
        tags = strategy.tags,
        context_rules = context_rules,
        count = elements.len(),
        data = data,
        example = strategy.example,
    )
}

/// Prompt for the free-text user-story path.
pub fn build_story_prompt(story: &str) -> String {
    format!(
        r#"Convert the following user story into comprehensive Gherkin test scenarios.
Include positive and negative test cases, edge cases, and boundary conditions.

User Story:
{story}

Requirements:
- Use proper Gherkin syntax with Feature, Scenario, Given, When, Then
- Add descriptive scenario titles
- Include tags for organization
- Create at least 3-5 scenarios covering different cases
- Focus on functional requirements
- Return only the feature text, without code fences"#,
        story = story.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::UniquenessContext;
    use std::collections::BTreeMap;

    fn element(category: Category, tag: &str, label: &str) -> UiElement {
        UiElement {
            category,
            tag_name: tag.to_string(),
            text_or_label: label.to_string(),
            attributes: BTreeMap::new(),
            fields: vec![],
            context: None,
        }
    }

    #[test]
    fn test_every_category_has_a_distinct_strategy() {
        let mut tags: Vec<_> = Category::ALL.iter().map(|c| strategy(*c).tags).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), Category::ALL.len());
    }

    #[test]
    fn test_category_prompt_embeds_elements_and_instruction() {
        let mut link = element(Category::Links, "a", "Read more");
        link.attributes
            .insert("href".to_string(), "https://example.com/a".to_string());
        link.context = Some(UniquenessContext {
            level: "href".into(),
            value: "a".into(),
        });

        let prompt = build_category_prompt(Category::Links, &[link], "https://example.com");
        assert!(prompt.contains("link elements extracted from https://example.com"));
        assert!(prompt.contains("non-empty destination"));
        assert!(prompt.contains("\"Read more\""));
        assert!(prompt.contains("\"uniqueness_context\""));
        assert!(prompt.contains("@link @visibility @interaction"));
        assert!(prompt.contains("Extracted elements (1)"));
    }

    #[test]
    fn test_form_prompt_includes_fields() {
        let mut form = element(Category::Forms, "form", "Login");
        form.fields
            .push(element(Category::Forms, "input", "Username"));
        let prompt = build_category_prompt(Category::Forms, &[form], "https://example.com/login");
        assert!(prompt.contains("\"fields\""));
        assert!(prompt.contains("Username"));
    }

    #[test]
    fn test_story_prompt() {
        let prompt = build_story_prompt("  As a user I want to reset my password  ");
        assert!(prompt.contains("User Story:\nAs a user I want to reset my password\n"));
        assert!(prompt.contains("negative test cases"));
    }
}
