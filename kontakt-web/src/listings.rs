use std::collections::HashSet;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::squash;

/// Links inspected by the keyword fallback.
const FALLBACK_LINK_LIMIT: usize = 20;

const JOB_KEYWORDS: &[&str] = &[
    "job",
    "position",
    "career",
    "vacancy",
    "stelle",
    "ausbildung",
    "praktikum",
];

const CARD_CANDIDATES: &[&str] = &[
    ".job-card",
    ".job-listing",
    ".job-item",
    ".jobs-list li",
    "[data-testid*='job']",
    "article.job",
    ".stellenangebot",
    ".vacancy",
    ".career-item",
];

const TITLE_CANDIDATES: &[&str] = &[
    ".job-title",
    ".title",
    "h2",
    "h3",
    "a[title]",
    ".position",
];

const COMPANY_CANDIDATES: &[&str] = &[".company", ".job-company", ".employer", ".firma"];

const LOCATION_CANDIDATES: &[&str] = &[".location", ".job-location", ".ort", ".place"];

/// One scraped job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
}

/// Ordered CSS candidates per listing part; the first candidate that yields
/// something wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSelectors {
    pub cards: Vec<String>,
    pub titles: Vec<String>,
    pub companies: Vec<String>,
    pub locations: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            cards: owned(CARD_CANDIDATES),
            titles: owned(TITLE_CANDIDATES),
            companies: owned(COMPANY_CANDIDATES),
            locations: owned(LOCATION_CANDIDATES),
        }
    }
}

impl ListingSelectors {
    /// Put a site-specific card selector ahead of the built-in candidates.
    pub fn prefer_card(mut self, css: impl Into<String>) -> Self {
        self.cards.insert(0, css.into());
        self
    }

    pub fn prefer_title(mut self, css: impl Into<String>) -> Self {
        self.titles.insert(0, css.into());
        self
    }

    pub fn prefer_company(mut self, css: impl Into<String>) -> Self {
        self.companies.insert(0, css.into());
        self
    }

    pub fn prefer_location(mut self, css: impl Into<String>) -> Self {
        self.locations.insert(0, css.into());
        self
    }
}

struct Compiled {
    cards: Vec<Selector>,
    titles: Vec<Selector>,
    companies: Vec<Selector>,
    locations: Vec<Selector>,
}

fn compile(list: &[String]) -> Vec<Selector> {
    list.iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(sel) => Some(sel),
            Err(_) => {
                warn!(target: "web.listings", %css, "skipping invalid selector");
                None
            }
        })
        .collect()
}

/// Extract listings from `html`.
///
/// Card candidates are tried in order; the first one that produces at least
/// one titled card is used. Without any, the first links whose text carries a
/// job keyword become listings. Results are unique by link URL.
pub fn extract_listings(
    html: &str,
    base: &Url,
    selectors: &ListingSelectors,
    scraped_at: DateTime<Utc>,
) -> Vec<JobListing> {
    let doc = Html::parse_document(html);
    let compiled = Compiled {
        cards: compile(&selectors.cards),
        titles: compile(&selectors.titles),
        companies: compile(&selectors.companies),
        locations: compile(&selectors.locations),
    };

    let mut listings = from_cards(&doc, base, &compiled, scraped_at);
    if listings.is_empty() {
        listings = from_keyword_links(&doc, base, scraped_at);
        debug!(target: "web.listings", count = listings.len(), "keyword link fallback");
    }
    dedup_by_url(listings, base)
}

fn from_cards(doc: &Html, base: &Url, sel: &Compiled, scraped_at: DateTime<Utc>) -> Vec<JobListing> {
    for card_sel in &sel.cards {
        let found: Vec<JobListing> = doc
            .select(card_sel)
            .filter_map(|card| {
                let title = first_text(card, &sel.titles)?;
                Some(JobListing {
                    title,
                    company: first_text(card, &sel.companies),
                    location: first_text(card, &sel.locations),
                    url: card_link(card, base).unwrap_or_else(|| base.to_string()),
                    scraped_at,
                })
            })
            .collect();
        if !found.is_empty() {
            debug!(target: "web.listings", count = found.len(), "card selector matched");
            return found;
        }
    }
    Vec::new()
}

fn from_keyword_links(doc: &Html, base: &Url, scraped_at: DateTime<Utc>) -> Vec<JobListing> {
    static_selector("a[href]")
        .map(|links| {
            doc.select(&links)
                .take(FALLBACK_LINK_LIMIT)
                .filter_map(|link| {
                    let title = squash(&link.text().collect::<String>());
                    let lower = title.to_lowercase();
                    if !JOB_KEYWORDS.iter().any(|k| lower.contains(k)) {
                        return None;
                    }
                    let url = resolve(base, link.value().attr("href")?)?;
                    Some(JobListing {
                        title,
                        company: None,
                        location: None,
                        url,
                        scraped_at,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn first_text(scope: ElementRef<'_>, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|sel| {
        scope.select(sel).find_map(|el| {
            let text = squash(&el.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
            el.value()
                .attr("title")
                .map(squash)
                .filter(|t| !t.is_empty())
        })
    })
}

fn card_link(card: ElementRef<'_>, base: &Url) -> Option<String> {
    if card.value().name() == "a" {
        return resolve(base, card.value().attr("href")?);
    }
    let links = static_selector("a[href]")?;
    let href = card.select(&links).next()?.value().attr("href")?;
    resolve(base, href)
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn static_selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Keep the first listing per URL. Cards without their own link all carry
/// the page URL and are kept as they are.
fn dedup_by_url(listings: Vec<JobListing>, base: &Url) -> Vec<JobListing> {
    let page = base.as_str();
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|l| l.url == page || seen.insert(l.url.clone()))
        .collect()
}
