//! Static-page acquisition and extraction.
//!
//! - Document loading from HTTP(S) or a local file (`fetch`)
//! - Job-listing extraction with ordered selector fallbacks (`listings`)
//! - Site summary: title, description, headline, phone number (`site_info`)
//!
//! Nothing here drives a browser; pages that need scripting go through
//! `kontakt-drivers` instead.

pub mod fetch;
pub mod listings;
pub mod site_info;

pub use fetch::{Document, PageFetcher};
pub use listings::{JobListing, ListingSelectors, extract_listings};
pub use site_info::{SiteInfo, extract_site_info};

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
