//! Static-DOM helpers over `scraper` snapshots.
//!
//! `scraper::Html` is not `Send`, so callers parse, extract plain strings and
//! drop the document before the next `.await`.

use scraper::{ElementRef, Html, Selector};

/// Form controls considered by the matchers.
pub const CONTROLS: &str = "input, textarea, select";

const NON_FILLABLE_INPUTS: &[&str] = &[
    "hidden", "submit", "button", "reset", "image", "file", "checkbox", "radio",
];

/// Parse a CSS selector, `None` when it is not valid CSS.
pub fn parse_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Lower-cased control kind: the tag name, or the input `type` (default `text`).
pub fn control_type(el: ElementRef<'_>) -> String {
    let tag = el.value().name();
    if tag == "input" {
        el.value()
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string())
    } else {
        tag.to_string()
    }
}

/// Whether a control accepts a typed or selected value.
pub fn is_fillable(el: ElementRef<'_>) -> bool {
    match el.value().name() {
        "textarea" | "select" => true,
        "input" => !NON_FILLABLE_INPUTS.contains(&control_type(el).as_str()),
        _ => false,
    }
}

/// Plain CSS identifier (ASCII subset), usable after `#` without escaping.
pub fn is_css_identifier(s: &str) -> bool {
    let rest = s.strip_prefix('-').unwrap_or(s);
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Single-quoted CSS string literal.
pub fn css_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `#id` when the id is a plain identifier, `[id='…']` otherwise.
pub fn id_selector(id: &str) -> String {
    if is_css_identifier(id) {
        format!("#{id}")
    } else {
        format!("[id={}]", css_quote(id))
    }
}

/// `[name='…']` selector.
pub fn name_selector(name: &str) -> String {
    format!("[name={}]", css_quote(name))
}

/// Absolute `tag:nth-of-type(n) > …` path from the root element.
pub fn element_path(el: ElementRef<'_>) -> String {
    let mut segments: Vec<String> = std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .map(|node| {
            let tag = node.value().name();
            let position = node
                .prev_siblings()
                .filter_map(ElementRef::wrap)
                .filter(|sib| sib.value().name() == tag)
                .count()
                + 1;
            format!("{tag}:nth-of-type({position})")
        })
        .collect();
    segments.reverse();
    segments.join(" > ")
}

/// Whether `css` selects exactly one element of `doc`.
pub fn matches_exactly_once(doc: &Html, css: &str) -> bool {
    parse_selector(css).is_some_and(|sel| doc.select(&sel).take(2).count() == 1)
}

/// Shortest stable selector for `el` within `doc`: unique id, unique name, else its path.
pub fn structural_selector(doc: &Html, el: ElementRef<'_>) -> String {
    if let Some(id) = el.value().id().filter(|id| !id.trim().is_empty()) {
        let css = id_selector(id);
        if matches_exactly_once(doc, &css) {
            return css;
        }
    }
    if let Some(name) = el.value().attr("name").filter(|n| !n.trim().is_empty()) {
        let css = format!("{}{}", el.value().name(), name_selector(name));
        if matches_exactly_once(doc, &css) {
            return css;
        }
    }
    element_path(el)
}

/// Visible text with whitespace collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First fillable control at or below `el`.
pub fn first_control(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let controls = parse_selector(CONTROLS)?;
    if el.value().name() != "label" && is_fillable(el) {
        return Some(el);
    }
    el.select(&controls).find(|c| is_fillable(*c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(doc: &'a Html, css: &str) -> ElementRef<'a> {
        doc.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn identifiers_and_quoting() {
        assert!(is_css_identifier("mail"));
        assert!(is_css_identifier("-x_1"));
        assert!(!is_css_identifier("1abc"));
        assert!(!is_css_identifier("form:email"));
        assert_eq!(id_selector("mail"), "#mail");
        assert_eq!(id_selector("form:email"), "[id='form:email']");
        assert_eq!(name_selector("it's"), r"[name='it\'s']");
    }

    #[test]
    fn element_path_resolves_back_to_the_element() {
        let doc = Html::parse_document(
            "<form><p><input name='a'></p><p><input name='b'><input name='c'></p></form>",
        );
        let target = first(&doc, "input[name='c']");
        let path = element_path(target);
        assert!(path.ends_with("p:nth-of-type(2) > input:nth-of-type(2)"));
        let again = first(&doc, &path);
        assert_eq!(again.value().attr("name"), Some("c"));
    }

    #[test]
    fn structural_selector_prefers_unique_id_then_name() {
        let doc = Html::parse_document(
            "<input id='x' name='dup'><input name='dup'><input name='solo'><input>",
        );
        assert_eq!(structural_selector(&doc, first(&doc, "#x")), "#x");
        assert_eq!(
            structural_selector(&doc, first(&doc, "[name='solo']")),
            "input[name='solo']"
        );
        let anonymous = doc
            .select(&Selector::parse("input").unwrap())
            .nth(3)
            .unwrap();
        assert!(structural_selector(&doc, anonymous).contains("input:nth-of-type(4)"));
    }

    #[test]
    fn fillable_controls_skip_buttons_and_hidden() {
        let doc = Html::parse_document(
            "<input type='hidden'><input type='EMAIL'><input type='checkbox'><textarea></textarea><button>x</button>",
        );
        let kinds: Vec<String> = doc
            .select(&Selector::parse("input, textarea, button").unwrap())
            .filter(|e| is_fillable(*e))
            .map(control_type)
            .collect();
        assert_eq!(kinds, vec!["email", "textarea"]);
    }
}
