//! Walks a rendered HTML document and buckets elements into categories.
//!
//! Extraction is pure: the same markup and cap always produce the same
//! inventory. Nodes are visited in document order and each one joins at most
//! one category, the first that matches in `Category::ALL` order.

use super::category::Category;
use super::context::{self, ContextFacts};
use super::element::{CategorizedInventory, UiElement};
use log::debug;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};
use std::collections::{BTreeMap, HashMap};
use url::Url;

const HIDDEN_CONTAINERS: &[&str] = &["script", "style", "noscript", "template"];
const ICON_CLASSES: &[&str] = &["fa", "fas", "far", "fal", "fab", "glyphicon", "material-icons"];
const ACTION_WORDS: &[&str] = &[
    "buy", "sign up", "signup", "register", "subscribe", "get started", "try", "download",
    "contact", "learn more", "book", "order", "start",
];
const LOGIN_WORDS: &[&str] = &["login", "log-in", "signin", "sign-in"];
const SIBLING_TEXT_LIMIT: usize = 60;
/// Paragraphs this short or shorter are layout fragments, not content.
const PARAGRAPH_MIN_CHARS: usize = 10;
const SNIPPET_CHARS: usize = 100;

/// Extract an inventory from markup with no base URL; relative hrefs and
/// srcs are kept as written.
pub fn extract(html: &str, cap: usize) -> CategorizedInventory {
    extract_with_base(html, cap, None)
}

/// Extract an inventory, resolving relative `href` and `src` values against
/// `base` when one is given.
pub fn extract_with_base(html: &str, cap: usize, base: Option<&Url>) -> CategorizedInventory {
    let mut inventory = CategorizedInventory::empty(cap);
    if cap == 0 || html.trim().is_empty() {
        return inventory;
    }

    let document = Html::parse_document(html);
    let labels = label_index(&document);
    let walker = Walker {
        base,
        labels: &labels,
    };

    let mut collected: BTreeMap<Category, Vec<(UiElement, ContextFacts)>> = BTreeMap::new();
    let mut form_ordinal = 0usize;

    for node in document.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if is_hidden(el) {
            continue;
        }

        let Some(category) = walker.classify(el) else {
            continue;
        };
        if category == Category::Forms {
            form_ordinal += 1;
        }

        let slot = collected.entry(category).or_default();
        if slot.len() >= cap {
            continue;
        }

        let element = walker.build(category, el, form_ordinal);
        let facts = context_facts(el, &element, base);
        slot.push((element, facts));

        if Category::ALL
            .iter()
            .all(|c| collected.get(c).is_some_and(|v| v.len() >= cap))
        {
            break;
        }
    }

    for (category, mut items) in collected {
        context::disambiguate(category, &mut items);
        for (element, _) in items {
            inventory.push(element);
        }
    }

    debug!(
        "Extracted {} elements: {}",
        inventory.total(),
        inventory
            .iter()
            .filter(|(_, e)| !e.is_empty())
            .map(|(c, e)| format!("{}={}", c, e.len()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    inventory
}

struct Walker<'a> {
    base: Option<&'a Url>,
    labels: &'a HashMap<String, String>,
}

impl<'a> Walker<'a> {
    fn classify(&self, el: ElementRef) -> Option<Category> {
        let tag = el.value().name();

        if is_heading_tag(tag) {
            return (!label_for(el).is_empty()).then_some(Category::Headings);
        }
        if tag == "p" {
            return is_paragraph(el).then_some(Category::Paragraphs);
        }
        if tag == "a" && el.value().attr("href").is_some() {
            return Some(Category::Links);
        }
        if is_button(el) {
            // Form-owned controls are reported as fields of their form
            return (!owned_by_form(el)).then_some(Category::Buttons);
        }
        if (tag == "img" && has_src(el)) || is_logo_container(el) {
            return Some(Category::ImagesAndLogos);
        }
        if is_icon(el) {
            return Some(Category::Icons);
        }
        if tag == "form" {
            return Some(Category::Forms);
        }
        None
    }

    fn build(&self, category: Category, el: ElementRef, form_ordinal: usize) -> UiElement {
        let value = el.value();
        let tag = value.name();
        let mut attributes = BTreeMap::new();
        let mut fields = Vec::new();

        let text_or_label = match category {
            Category::Headings => {
                attributes.insert("level".to_string(), tag[1..].to_string());
                copy_attrs(value, &mut attributes, &["id", "aria-label"]);
                label_for(el)
            }
            Category::Paragraphs => {
                copy_attrs(value, &mut attributes, &["id"]);
                snippet(&visible_text(el))
            }
            Category::Links => {
                copy_attrs(value, &mut attributes, &["id", "target", "title", "aria-label", "rel"]);
                if let Some(href) = value.attr("href") {
                    attributes.insert("href".to_string(), self.resolve(href));
                }
                let label = label_for(el);
                attributes.insert("link_kind".to_string(), link_kind(el, &label).to_string());
                label
            }
            Category::Buttons => {
                copy_attrs(value, &mut attributes, &["id", "name", "type", "value", "aria-label"]);
                if value.attr("disabled").is_some() {
                    attributes.insert("disabled".to_string(), "true".to_string());
                }
                label_for(el)
            }
            Category::ImagesAndLogos => {
                copy_attrs(value, &mut attributes, &["id", "alt", "width", "height"]);
                if let Some(src) = value.attr("src") {
                    attributes.insert("src".to_string(), self.resolve(src));
                }
                if tag != "img" || mentions_logo(el) || within(el, "header") {
                    attributes.insert("is_logo".to_string(), "true".to_string());
                }
                if let Some(link) = el
                    .parent()
                    .and_then(ElementRef::wrap)
                    .filter(|p| tag == "img" && p.value().name() == "a")
                {
                    attributes.insert("is_clickable".to_string(), "true".to_string());
                    if let Some(href) = link.value().attr("href") {
                        attributes.insert("parent_href".to_string(), self.resolve(href));
                    }
                }
                label_for(el)
            }
            Category::Icons => {
                copy_attrs(value, &mut attributes, &["aria-label", "role", "title"]);
                if tag == "svg" {
                    if let Some(title) = first_text_within(el, |t| t == "title") {
                        attributes.insert("title".to_string(), title);
                    }
                }
                label_for(el)
            }
            Category::Forms => {
                copy_attrs(value, &mut attributes, &["id", "name"]);
                let method = value.attr("method").map(str::trim).unwrap_or_default();
                let method = if method.is_empty() { "get".to_string() } else { method.to_lowercase() };
                attributes.insert("method".to_string(), method);
                if let Some(action) = value.attr("action") {
                    attributes.insert("action".to_string(), self.resolve(action));
                }
                fields = self.form_fields(el);
                form_identifier(el, &fields, form_ordinal)
            }
        };

        let classes = class_list(el);
        if !classes.is_empty() {
            attributes.insert("class".to_string(), classes);
        }

        UiElement {
            category,
            tag_name: tag.to_string(),
            text_or_label,
            attributes,
            fields,
            context: None,
        }
    }

    /// Controls inside the form, then controls elsewhere that name it in a
    /// `form` attribute.
    fn form_fields(&self, form: ElementRef) -> Vec<UiElement> {
        let associated = form.value().id().map(|id| {
            form.tree()
                .root()
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(move |el| el.value().attr("form") == Some(id) && !is_inside(*el, form))
        });

        form.descendants()
            .filter_map(ElementRef::wrap)
            .chain(associated.into_iter().flatten())
            .filter(|el| matches!(el.value().name(), "input" | "textarea" | "select" | "button"))
            .filter(|el| {
                !el.value()
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
            })
            .map(|el| self.form_field(form, el))
            .collect()
    }

    fn form_field(&self, form: ElementRef, el: ElementRef) -> UiElement {
        let value = el.value();
        let tag = value.name();
        let field_type = match tag {
            "input" => value.attr("type").unwrap_or("text").to_lowercase(),
            "button" => value.attr("type").unwrap_or("submit").to_lowercase(),
            other => other.to_string(),
        };

        let mut attributes = BTreeMap::new();
        attributes.insert("type".to_string(), field_type);
        for name in ["name", "id", "placeholder", "value"] {
            if let Some(v) = value.attr(name).map(str::trim).filter(|v| !v.is_empty()) {
                attributes.insert(name.to_string(), v.to_string());
            }
        }
        if value.attr("required").is_some() {
            attributes.insert("required".to_string(), "true".to_string());
        }

        UiElement {
            category: Category::Forms,
            tag_name: tag.to_string(),
            text_or_label: self.field_label(form, el),
            attributes,
            fields: Vec::new(),
            context: None,
        }
    }

    /// `<label for=id>`, then a wrapping `<label>`, then the element's own
    /// accessible name.
    fn field_label(&self, form: ElementRef, el: ElementRef) -> String {
        if let Some(label) = el.value().id().and_then(|id| self.labels.get(id)) {
            return label.clone();
        }
        let wrapping = el
            .ancestors()
            .take_while(|n| n.id() != form.id())
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "label");
        if let Some(label) = wrapping.map(visible_text).filter(|t| !t.is_empty()) {
            return label;
        }
        label_for(el)
    }

    fn resolve(&self, raw: &str) -> String {
        let raw = raw.trim();
        match self.base {
            Some(base) => base
                .join(raw)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }
}

fn is_hidden(el: ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "head" | "script" | "style" | "noscript" | "template"))
}

fn is_button(el: ElementRef) -> bool {
    let value = el.value();
    match value.name() {
        "button" => true,
        "input" => value.attr("type").is_some_and(|t| {
            matches!(t.to_ascii_lowercase().as_str(), "button" | "submit" | "reset")
        }),
        _ => value
            .attr("role")
            .is_some_and(|r| r.eq_ignore_ascii_case("button")),
    }
}

/// A submit/button control that belongs to a form, by nesting or through a
/// `form` attribute naming an existing form.
fn owned_by_form(el: ElementRef) -> bool {
    if !matches!(el.value().name(), "button" | "input") {
        return false;
    }
    if within(el, "form") {
        return true;
    }
    let Some(owner) = el
        .value()
        .attr("form")
        .map(str::trim)
        .filter(|f| !f.is_empty())
    else {
        return false;
    };
    el.tree()
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|f| f.value().name() == "form" && f.value().id() == Some(owner))
}

fn is_inside(el: ElementRef, container: ElementRef) -> bool {
    el.ancestors().any(|a| a.id() == container.id())
}

fn has_src(el: ElementRef) -> bool {
    el.value().attr("src").is_some_and(|src| !src.trim().is_empty())
}

/// A `<p>` worth testing: not the body of a link or button, not a wrapper
/// around a lone heading, and longer than a fragment.
fn is_paragraph(el: ElementRef) -> bool {
    let interactive_parent = el.parent().and_then(ElementRef::wrap).is_some_and(|p| {
        matches!(p.value().name(), "a" | "button")
            || p.value()
                .attr("role")
                .is_some_and(|r| r.eq_ignore_ascii_case("button"))
    });
    if interactive_parent {
        return false;
    }

    let mut significant = el.children().filter(|c| match c.value() {
        Node::Text(t) => !t.trim().is_empty(),
        Node::Element(_) => true,
        _ => false,
    });
    if let (Some(only), None) = (significant.next(), significant.next()) {
        if ElementRef::wrap(only).is_some_and(|c| is_heading_tag(c.value().name())) {
            return false;
        }
    }

    visible_text(el).chars().count() > PARAGRAPH_MIN_CHARS
}

/// The first `SNIPPET_CHARS` characters, with an ellipsis when cut.
fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(SNIPPET_CHARS).collect();
    cut.push_str("...");
    cut
}

fn mentions_logo(el: ElementRef) -> bool {
    let value = el.value();
    value.classes().any(|c| c.to_lowercase().contains("logo"))
        || value.id().is_some_and(|id| id.to_lowercase().contains("logo"))
        || value
            .attr("alt")
            .is_some_and(|alt| alt.to_lowercase().contains("logo"))
}

/// A non-image element marked as a logo that does not wrap an `<img>`
/// (the image itself is reported instead).
fn is_logo_container(el: ElementRef) -> bool {
    if matches!(el.value().name(), "html" | "body" | "form" | "img") || !mentions_logo(el) {
        return false;
    }
    !el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|d| d.value().name() == "img")
}

fn is_icon(el: ElementRef) -> bool {
    let value = el.value();
    let has_name = value.attr("aria-label").is_some()
        || value.attr("role").is_some_and(|r| r.eq_ignore_ascii_case("img"));

    match value.name() {
        "i" | "span" => {
            let icon_class = value.classes().any(|c| {
                let c = c.to_lowercase();
                c.contains("icon") || ICON_CLASSES.contains(&c.as_str())
            });
            let bare_i = value.name() == "i"
                && value.classes().next().is_some()
                && visible_text(el).is_empty();
            icon_class || bare_i || (value.name() == "i" && has_name)
        }
        "svg" => {
            let titled = el
                .children()
                .filter_map(ElementRef::wrap)
                .any(|c| c.value().name() == "title");
            let in_control = el
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| matches!(a.value().name(), "a" | "button"));
            (has_name || titled) && !in_control
        }
        _ => false,
    }
}

/// Whitespace-collapsed text under `el`, skipping script and style content.
fn visible_text(el: ElementRef) -> String {
    let mut parts = Vec::new();
    for node in el.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .filter_map(ElementRef::wrap)
            .any(|a| HIDDEN_CONTAINERS.contains(&a.value().name()));
        if !hidden {
            parts.push(&**text);
        }
    }
    parts
        .concat()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text, falling back to accessible-name attributes.
fn label_for(el: ElementRef) -> String {
    let text = visible_text(el);
    if !text.is_empty() {
        return text;
    }
    let value = el.value();
    ["aria-label", "title", "alt", "value", "placeholder", "name"]
        .iter()
        .filter_map(|name| value.attr(name))
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

fn copy_attrs(value: &Element, attributes: &mut BTreeMap<String, String>, names: &[&str]) {
    for name in names {
        if let Some(v) = value.attr(name).map(str::trim).filter(|v| !v.is_empty()) {
            attributes.insert(name.to_string(), v.to_string());
        }
    }
}

fn class_list(el: ElementRef) -> String {
    el.value().classes().collect::<Vec<_>>().join(" ")
}

fn label_index(document: &Html) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for node in document.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if el.value().name() != "label" {
            continue;
        }
        if let Some(target) = el.value().attr("for") {
            let text = visible_text(el);
            if !text.is_empty() {
                labels.entry(target.to_string()).or_insert(text);
            }
        }
    }
    labels
}

fn within(el: ElementRef, tag: &str) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == tag)
}

fn link_kind(el: ElementRef, label: &str) -> &'static str {
    let mut in_nav = false;
    for ancestor in el.ancestors().filter_map(ElementRef::wrap) {
        let value = ancestor.value();
        let aria = value.attr("aria-label").unwrap_or_default().to_lowercase();
        let classes = class_list(ancestor).to_lowercase();
        if aria.contains("breadcrumb") || classes.contains("breadcrumb") {
            return "breadcrumb_item";
        }
        if classes.contains("social") {
            return "social_link";
        }
        if value.name() == "nav"
            || value
                .attr("role")
                .is_some_and(|r| r.eq_ignore_ascii_case("navigation"))
        {
            in_nav = true;
        }
    }
    if in_nav {
        return "nav_item";
    }

    if within(el, "header") {
        return "header_link";
    }
    if within(el, "footer") {
        return "footer_link";
    }

    let lower = label.to_lowercase();
    if ACTION_WORDS.iter().any(|w| lower.contains(w)) {
        return "action_link";
    }
    "regular_link"
}

/// Name a form by the first clue available: aria-label, id, data-form-id,
/// legend, an inner heading, a heading just before it, a login shape, and
/// finally its position on the page.
fn form_identifier(form: ElementRef, fields: &[UiElement], ordinal: usize) -> String {
    let value = form.value();
    for name in ["aria-label", "id", "data-form-id"] {
        if let Some(v) = value.attr(name).map(str::trim).filter(|v| !v.is_empty()) {
            return v.to_string();
        }
    }

    if let Some(legend) = first_text_within(form, |tag| tag == "legend") {
        return legend;
    }
    if let Some(heading) = first_text_within(form, is_heading_tag) {
        return heading;
    }

    let preceding_heading = form
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .next()
        .filter(|s| is_heading_tag(s.value().name()))
        .map(visible_text)
        .filter(|t| !t.is_empty());
    if let Some(heading) = preceding_heading {
        return heading;
    }

    if looks_like_login(form, fields) {
        return "the login form".to_string();
    }

    format!("form #{}", ordinal)
}

fn looks_like_login(form: ElementRef, fields: &[UiElement]) -> bool {
    let classes = class_list(form).to_lowercase();
    if LOGIN_WORDS.iter().any(|w| classes.contains(w)) {
        return true;
    }

    let has_password = fields.iter().any(|f| f.attr("type") == Some("password"));
    let has_identity = fields.iter().any(|f| {
        if f.attr("type") == Some("email") {
            return true;
        }
        let haystack = format!(
            "{} {} {}",
            f.text_or_label,
            f.attr("name").unwrap_or_default(),
            f.attr("id").unwrap_or_default()
        )
        .to_lowercase();
        ["user", "email", "login"].iter().any(|w| haystack.contains(w))
    });
    has_password && has_identity
}

fn first_text_within(el: ElementRef, wanted: impl Fn(&str) -> bool) -> Option<String> {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|d| wanted(d.value().name()))
        .map(visible_text)
        .find(|t| !t.is_empty())
}

fn is_heading_tag(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn context_facts(el: ElementRef, element: &UiElement, base: Option<&Url>) -> ContextFacts {
    let mut facts = ContextFacts::new();
    let value = el.value();

    if let Some(id) = value.id() {
        facts.insert("id", id.to_string());
    }
    if let Some(v) = value.attr("aria-label") {
        facts.insert("aria_label", v.trim().to_string());
    }
    for (key, attr) in [("name", "name"), ("type", "type"), ("title", "title")] {
        if let Some(v) = value.attr(attr).filter(|v| !v.trim().is_empty()) {
            facts.insert(key, v.trim().to_string());
        }
    }
    if let Some(href) = value.attr("href") {
        let resolved = match base {
            Some(base) => base.join(href.trim()).map(|u| u.to_string()).ok(),
            None => None,
        };
        if let Some(path) = context::href_path(resolved.as_deref().unwrap_or(href.trim())) {
            facts.insert("href", path);
        }
    }
    if let Some(src) = element.attr("src") {
        facts.insert("src", src.to_string());
    }
    let classes = class_list(el);
    if !classes.is_empty() {
        facts.insert("classes", classes);
    }

    if let Some(parent) = el.parent().and_then(ElementRef::wrap) {
        let parent_tag = parent.value().name();
        let parent_classes = class_list(parent);
        let description = match parent.value().id() {
            Some(id) => {
                facts.insert("parent.id", id.to_string());
                format!("{} with ID \"{}\"", parent_tag, id)
            }
            None if !parent_classes.is_empty() => {
                format!("{} with classes \"{}\"", parent_tag, parent_classes)
            }
            None => format!("parent {}", parent_tag),
        };
        if !parent_classes.is_empty() {
            facts.insert("parent_classes", parent_classes);
        }
        facts.insert("parent_description", description);
    }

    if let Some(text) = sibling_text(el) {
        facts.insert("sibling_text", text);
    }

    facts
}

/// Text of the nearest non-empty sibling, following first, then preceding.
fn sibling_text(el: ElementRef) -> Option<String> {
    el.next_siblings()
        .find_map(|n| node_text(n.value(), ElementRef::wrap(n)))
        .or_else(|| {
            el.prev_siblings()
                .find_map(|n| node_text(n.value(), ElementRef::wrap(n)))
        })
}

fn node_text(node: &Node, element: Option<ElementRef>) -> Option<String> {
    let text = match (node, element) {
        (Node::Text(t), _) => t.split_whitespace().collect::<Vec<_>>().join(" "),
        (Node::Element(_), Some(el)) => visible_text(el),
        _ => String::new(),
    };
    (!text.is_empty()).then(|| text.chars().take(SIBLING_TEXT_LIMIT).collect())
}
