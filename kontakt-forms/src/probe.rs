use anyhow::Result;
use scraper::Html;

use crate::catalog::{Probe, BUTTON_LIKE};
use crate::dom;
use crate::page::{PageTarget, Scope};

/// A control clicked by [`click_first`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHit {
    pub probe: String,
    pub scope: Scope,
    pub selector: String,
}

/// Try each probe in order, top document before frames; click the first
/// element that accepts a click. Click failures move on to the next candidate.
pub async fn click_first<P: PageTarget>(page: &P, probes: &[Probe]) -> Result<Option<ProbeHit>> {
    let frames = page.frame_count().await.unwrap_or(0);
    for probe in probes {
        for scope in Scope::all(frames) {
            for selector in candidates(page, scope, probe).await {
                let Some(element) = page.locate_first(scope, &selector).await? else {
                    continue;
                };
                if let Err(e) = page.scroll_into_view(&element).await {
                    tracing::trace!(target: "forms.probe", %selector, error = %e, "scroll failed");
                }
                match page.click(&element).await {
                    Ok(()) => {
                        return Ok(Some(ProbeHit {
                            probe: probe.to_string(),
                            scope,
                            selector,
                        }));
                    }
                    Err(e) => {
                        tracing::debug!(target: "forms.probe", %probe, %selector, error = %e, "click rejected");
                    }
                }
            }
        }
    }
    Ok(None)
}

async fn candidates<P: PageTarget>(page: &P, scope: Scope, probe: &Probe) -> Vec<String> {
    match probe {
        Probe::Css(css) => vec![(*css).to_string()],
        Probe::Text(needle) => match page.content(scope).await {
            Ok(html) => text_matches(&html, needle),
            Err(_) => Vec::new(),
        },
    }
}

/// Structural selectors of button-like elements whose text or `value` contains `needle`.
pub fn text_matches(html: &str, needle: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Some(buttons) = dom::parse_selector(BUTTON_LIKE) else {
        return Vec::new();
    };
    let needle = needle.to_lowercase();
    let mut out = Vec::new();
    for el in doc.select(&buttons) {
        let text = dom::element_text(el);
        let value = el.value().attr("value").unwrap_or_default();
        if text.to_lowercase().contains(&needle) || value.to_lowercase().contains(&needle) {
            let selector = dom::structural_selector(&doc, el);
            if !out.contains(&selector) {
                out.push(selector);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_matches_button_text_and_value() {
        let html = r#"<form>
            <button id="go">Jetzt absenden</button>
            <input type="button" value="SENDEN">
            <a href="/x">Absenden</a>
        </form>"#;
        let found = text_matches(html, "Senden");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], "#go");
        assert!(found[1].contains("input:nth-of-type(1)"));
    }
}
