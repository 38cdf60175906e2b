//! The live-page seam the fill engine drives.
//!
//! Implemented over WebDriver in `kontakt-drivers`; tests use an in-memory
//! fake over `scraper` documents.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// Where an element lives: the top document or the n-th child frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Top,
    Frame(usize),
}

impl Scope {
    /// Top document first, then each frame in document order.
    pub fn all(frame_count: usize) -> impl Iterator<Item = Scope> {
        std::iter::once(Scope::Top).chain((0..frame_count).map(Scope::Frame))
    }
}

/// How to pick an `<option>` from a `<select>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionChoice<'a> {
    /// Option whose visible text equals the value.
    Label(&'a str),
    /// First option; used when no label matches.
    First,
}

#[async_trait]
pub trait PageTarget: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<()>;

    /// Serialized HTML of the given document.
    async fn content(&self, scope: Scope) -> Result<String>;

    async fn frame_count(&self) -> Result<usize>;

    /// All elements matching a CSS selector; empty when nothing matches.
    async fn locate(&self, scope: Scope, selector: &str) -> Result<Vec<Self::Element>>;

    /// Poll until `selector` matches or `timeout` elapses; `Ok(false)` on timeout.
    async fn wait_for(&self, scope: Scope, selector: &str, timeout: Duration) -> Result<bool>;

    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>>;

    async fn text(&self, element: &Self::Element) -> Result<String>;

    async fn tag_name(&self, element: &Self::Element) -> Result<String>;

    async fn click(&self, element: &Self::Element) -> Result<()>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<()>;

    /// Replace the control's value in one step.
    async fn set_value(&self, element: &Self::Element, value: &str) -> Result<()>;

    /// Clear the control, then type character by character with `delay`
    /// between keystrokes. Typing the same text twice leaves it once.
    async fn type_text(&self, element: &Self::Element, text: &str, delay: Duration) -> Result<()>;

    async fn select_option(&self, element: &Self::Element, choice: OptionChoice<'_>) -> Result<()>;

    /// First element for `selector` in `scope`, if any.
    async fn locate_first(&self, scope: Scope, selector: &str) -> Result<Option<Self::Element>> {
        Ok(self.locate(scope, selector).await?.into_iter().next())
    }
}
