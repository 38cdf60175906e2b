use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::squash;

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+49\s?|\b0)[1-9][0-9\s\-]{7,}\b").expect("phone pattern compiles")
});

const MIN_PHONE_DIGITS: usize = 7;
const SKIPPED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Summary of a company or job page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub headline: Option<String>,
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyword_lines: Vec<String>,
}

impl SiteInfo {
    pub fn mentions_keyword(&self) -> bool {
        !self.keyword_lines.is_empty()
    }
}

/// Extract a [`SiteInfo`]; `keyword` matching is case-insensitive.
pub fn extract_site_info(html: &str, url: &str, keyword: Option<&str>) -> SiteInfo {
    let doc = Html::parse_document(html);
    let lines = text_lines(&doc);

    let keyword_lines = match keyword.map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => {
            let needle = k.to_lowercase();
            lines
                .iter()
                .filter(|l| l.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        None => Vec::new(),
    };

    SiteInfo {
        url: url.to_string(),
        title: first_text(&doc, "title"),
        description: meta_content(&doc, "meta[name='description']")
            .or_else(|| meta_content(&doc, "meta[property='og:description']")),
        headline: first_text(&doc, "h1").or_else(|| first_text(&doc, "h2")),
        phone: lines.iter().find_map(|l| first_phone(l)),
        keyword_lines,
    }
}

/// First phone-number-like run in `text` with enough digits.
pub fn first_phone(text: &str) -> Option<String> {
    PHONE
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| {
            candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
        })
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel)
        .map(|el| squash(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(squash)
        .find(|t| !t.is_empty())
}

/// Visible text nodes, whitespace-squashed, empties dropped.
fn text_lines(doc: &Html) -> Vec<String> {
    doc.root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(|p| p.value().as_element().map(|e| e.name()));
            if parent.is_some_and(|name| SKIPPED_TEXT_PARENTS.contains(&name)) {
                return None;
            }
            let line = squash(text);
            (!line.is_empty()).then_some(line)
        })
        .collect()
}
