//! WebDriver-backed page access for the form engine.
//!
//! - [`kontakt_browser::driver::KontaktDriver`]: session setup for Chrome or Firefox
//! - [`kontakt_browser::page::KontaktPage`]: [`kontakt_forms::PageTarget`] over a live session
//! - [`kontakt_browser::behavioral::BehavioralEngine`]: pacing and per-key typing
//! - [`kontakt_browser::launch`]: browser arguments and capabilities
pub mod kontakt_browser;
