//! Label and placeholder fallback for roles the matchers could not resolve.
//!
//! Candidates are ranked on a static snapshot of each document (exact text
//! first, then by synonym order) and turned into structural selectors, which
//! are then resolved against the live page.

use anyhow::Result;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::catalog::Vocabulary;
use crate::dom;
use crate::mapping::FieldMapping;
use crate::page::{PageTarget, Scope};
use crate::role::FormField;

/// Which visible text led to the control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hint {
    Label,
    Placeholder,
}

/// A control found by visible text, resolved on the live page.
pub struct SemanticHit<E> {
    pub scope: Scope,
    pub selector: String,
    pub element: E,
}

/// Controls already spoken for during one fill pass.
///
/// Mapped selectors hold in every document; controls resolved by the pass
/// itself only in the document they were found in.
#[derive(Debug, Clone, Default)]
pub struct Claimed {
    mapped: Vec<String>,
    resolved: Vec<(Scope, String)>,
}

impl Claimed {
    pub fn from_mapping(mapping: &FieldMapping) -> Self {
        Self {
            mapped: mapping.iter().filter_map(|d| d.selector.clone()).collect(),
            resolved: Vec::new(),
        }
    }

    pub fn insert(&mut self, scope: Scope, selector: impl Into<String>) {
        self.resolved.push((scope, selector.into()));
    }

    pub fn selectors(&self, scope: Scope) -> Vec<&str> {
        self.mapped
            .iter()
            .map(String::as_str)
            .chain(
                self.resolved
                    .iter()
                    .filter(|(s, _)| *s == scope)
                    .map(|(_, sel)| sel.as_str()),
            )
            .collect()
    }
}

/// Search every document (top first, then frames) for a control whose label,
/// or failing that placeholder, names `role`. Claimed controls are skipped.
pub async fn locate<P: PageTarget>(
    page: &P,
    vocabulary: &Vocabulary,
    role: FormField,
    claimed: &Claimed,
) -> Result<Option<(Hint, SemanticHit<P::Element>)>> {
    let frames = page.frame_count().await.unwrap_or(0);
    for hint in [Hint::Label, Hint::Placeholder] {
        for scope in Scope::all(frames) {
            let html = match page.content(scope).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(target: "forms.fill", ?scope, error = %e, "document unavailable");
                    continue;
                }
            };
            let taken = claimed.selectors(scope);
            let candidates = match hint {
                Hint::Label => label_candidates(&html, vocabulary, role, &taken),
                Hint::Placeholder => placeholder_candidates(&html, vocabulary, role, &taken),
            };
            for selector in candidates {
                if let Some(element) = page.locate_first(scope, &selector).await? {
                    tracing::debug!(target: "forms.fill", %role, ?hint, ?scope, %selector, "semantic match");
                    return Ok(Some((
                        hint,
                        SemanticHit {
                            scope,
                            selector,
                            element,
                        },
                    )));
                }
            }
        }
    }
    Ok(None)
}

/// Selectors of controls whose label text names `role`, best first.
///
/// A label reaches its control through `for`, by wrapping it, or as the next
/// sibling control. `aria-label` on the control counts as a label. Controls
/// first-matched by any `taken` selector are left out.
pub fn label_candidates(
    html: &str,
    vocabulary: &Vocabulary,
    role: FormField,
    taken: &[&str],
) -> Vec<String> {
    let doc = Html::parse_document(html);
    let taken = claimed_controls(&doc, taken);
    let entry = vocabulary.entry(role);
    let mut ranked: Vec<((bool, usize), String)> = Vec::new();

    if let Some(labels) = dom::parse_selector("label") {
        for label in doc.select(&labels) {
            let text = dom::element_text(label);
            let Some(rank) = vocabulary.label_rank(role, &text) else {
                continue;
            };
            if let Some(control) = labelled_control(&doc, label).filter(|c| !taken.contains(c)) {
                let exact = is_exact(&text, &entry.labels);
                ranked.push(((!exact, rank), dom::structural_selector(&doc, control)));
            }
        }
    }

    if let Some(aria) = dom::parse_selector("[aria-label]") {
        for control in doc
            .select(&aria)
            .filter(|c| dom::is_fillable(*c) && !taken.contains(c))
        {
            let text = control.value().attr("aria-label").unwrap_or_default();
            if let Some(rank) = vocabulary.label_rank(role, text) {
                let exact = is_exact(text, &entry.labels);
                ranked.push(((!exact, rank), dom::structural_selector(&doc, control)));
            }
        }
    }

    into_selectors(ranked)
}

/// Selectors of controls whose placeholder names `role`, best first.
pub fn placeholder_candidates(
    html: &str,
    vocabulary: &Vocabulary,
    role: FormField,
    taken: &[&str],
) -> Vec<String> {
    let doc = Html::parse_document(html);
    let taken = claimed_controls(&doc, taken);
    let entry = vocabulary.entry(role);
    let Some(with_placeholder) = dom::parse_selector("[placeholder]") else {
        return Vec::new();
    };

    let ranked = doc
        .select(&with_placeholder)
        .filter(|c| dom::is_fillable(*c) && !taken.contains(c))
        .filter_map(|control| {
            let text = control.value().attr("placeholder")?;
            let rank = vocabulary.placeholder_rank(role, text)?;
            let exact = is_exact(text, &entry.placeholders);
            Some(((!exact, rank), dom::structural_selector(&doc, control)))
        })
        .collect();

    into_selectors(ranked)
}

/// The element each selector resolves to, as `locate_first` would pick it.
fn claimed_controls<'a>(doc: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    selectors
        .iter()
        .filter_map(|css| dom::parse_selector(css))
        .filter_map(|sel| doc.select(&sel).next())
        .collect()
}

fn labelled_control<'a>(doc: &'a Html, label: ElementRef<'a>) -> Option<ElementRef<'a>> {
    if let Some(target) = label.value().attr("for").filter(|f| !f.trim().is_empty()) {
        let by_id = dom::parse_selector(&dom::id_selector(target))?;
        if let Some(control) = doc.select(&by_id).find(|c| dom::is_fillable(*c)) {
            return Some(control);
        }
    }
    if let Some(control) = dom::first_control(label) {
        return Some(control);
    }
    label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take(3)
        .find_map(dom::first_control)
}

/// Visible text equals a synonym, ignoring case and a trailing `*` or `:`.
fn is_exact(text: &str, synonyms: &[String]) -> bool {
    let cleaned = text
        .trim()
        .trim_end_matches(|c: char| c == '*' || c == ':' || c.is_whitespace())
        .to_lowercase();
    synonyms.iter().any(|s| s.to_lowercase() == cleaned)
}

fn into_selectors(mut ranked: Vec<((bool, usize), String)>) -> Vec<String> {
    ranked.sort_by_key(|(score, _)| *score);
    let mut out: Vec<String> = Vec::with_capacity(ranked.len());
    for (_, selector) in ranked {
        if !out.contains(&selector) {
            out.push(selector);
        }
    }
    out
}
