use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use fantoccini::{elements::Element, error::CmdError, Client, Locator};
use kontakt_forms::page::{OptionChoice, PageTarget, Scope};
use serde_json::json;
use tracing::{debug, info};

use crate::kontakt_browser::behavioral::BehavioralEngine;

const SET_VALUE_JS: &str = r#"
    const el = arguments[0];
    const value = arguments[1];
    if (el.readOnly || el.disabled) {
        return 'element is read-only or disabled';
    }
    if (!('value' in el)) {
        return 'element has no value property';
    }
    el.focus();
    el.value = value;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return el.value === value ? null : 'value did not stick';
"#;

const SCROLL_JS: &str = "arguments[0].scrollIntoView({ block: 'center', inline: 'nearest' });";

const FRAME_COUNT_JS: &str = "return window.frames.length;";

/// A located element plus the document it belongs to.
#[derive(Debug, Clone)]
pub struct ScopedElement {
    pub element: Element,
    pub scope: Scope,
}

/// [`PageTarget`] over a live WebDriver session.
///
/// WebDriver addresses one browsing context at a time, so every call first
/// switches to the element's frame. The last focused scope is cached.
pub struct KontaktPage {
    client: Client,
    behavioral_engine: BehavioralEngine,
    focused: Mutex<Scope>,
}

impl KontaktPage {
    pub fn new(client: Client, behavioral_engine: BehavioralEngine) -> Self {
        Self {
            client,
            behavioral_engine,
            focused: Mutex::new(Scope::Top),
        }
    }

    /// Page title of the top document.
    pub async fn title(&self) -> Result<String> {
        self.focus(Scope::Top).await?;
        Ok(self.client.title().await?)
    }

    pub async fn current_url(&self) -> Result<String> {
        Ok(self.client.current_url().await?.to_string())
    }

    fn cached_scope(&self) -> Scope {
        self.focused.lock().map(|s| *s).unwrap_or(Scope::Top)
    }

    fn remember_scope(&self, scope: Scope) {
        if let Ok(mut focused) = self.focused.lock() {
            *focused = scope;
        }
    }

    async fn focus(&self, scope: Scope) -> Result<()> {
        if self.cached_scope() == scope {
            return Ok(());
        }
        self.client.enter_frame(None).await?;
        self.remember_scope(Scope::Top);
        if let Scope::Frame(index) = scope {
            let index = u16::try_from(index).map_err(|_| anyhow!("frame index {index} out of range"))?;
            self.client.enter_frame(index).await?;
            self.remember_scope(scope);
        }
        Ok(())
    }

    async fn focus_on(&self, element: &ScopedElement) -> Result<()> {
        self.focus(element.scope).await
    }
}

#[async_trait]
impl PageTarget for KontaktPage {
    type Element = ScopedElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        self.behavioral_engine.action_pause().await;
        self.client.goto(url).await?;
        self.remember_scope(Scope::Top);
        info!(target: "driver.page", %url, "navigated");
        Ok(())
    }

    async fn content(&self, scope: Scope) -> Result<String> {
        self.focus(scope).await?;
        Ok(self.client.source().await?)
    }

    async fn frame_count(&self) -> Result<usize> {
        self.focus(Scope::Top).await?;
        let count = self.client.execute(FRAME_COUNT_JS, vec![]).await?;
        Ok(count.as_u64().unwrap_or(0) as usize)
    }

    async fn locate(&self, scope: Scope, selector: &str) -> Result<Vec<ScopedElement>> {
        self.focus(scope).await?;
        let found = self.client.find_all(Locator::Css(selector)).await?;
        debug!(target: "driver.page", %selector, ?scope, count = found.len(), "located");
        Ok(found
            .into_iter()
            .map(|element| ScopedElement { element, scope })
            .collect())
    }

    async fn wait_for(&self, scope: Scope, selector: &str, timeout: Duration) -> Result<bool> {
        self.focus(scope).await?;
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn attribute(&self, element: &ScopedElement, name: &str) -> Result<Option<String>> {
        self.focus_on(element).await?;
        Ok(element.element.attr(name).await?)
    }

    async fn text(&self, element: &ScopedElement) -> Result<String> {
        self.focus_on(element).await?;
        Ok(element.element.text().await?)
    }

    async fn tag_name(&self, element: &ScopedElement) -> Result<String> {
        self.focus_on(element).await?;
        Ok(element.element.tag_name().await?)
    }

    async fn click(&self, element: &ScopedElement) -> Result<()> {
        self.focus_on(element).await?;
        element.element.click().await?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ScopedElement) -> Result<()> {
        self.focus_on(element).await?;
        let arg = serde_json::to_value(&element.element)?;
        self.client.execute(SCROLL_JS, vec![arg]).await?;
        Ok(())
    }

    async fn set_value(&self, element: &ScopedElement, value: &str) -> Result<()> {
        self.focus_on(element).await?;
        let arg = serde_json::to_value(&element.element)?;
        let verdict = self
            .client
            .execute(SET_VALUE_JS, vec![arg, json!(value)])
            .await?;
        match verdict.as_str() {
            Some(reason) => bail!("{reason}"),
            None => Ok(()),
        }
    }

    async fn type_text(&self, element: &ScopedElement, text: &str, delay: Duration) -> Result<()> {
        self.focus_on(element).await?;
        element.element.clear().await?;
        self.behavioral_engine
            .type_text(&element.element, text, delay)
            .await
    }

    async fn select_option(&self, element: &ScopedElement, choice: OptionChoice<'_>) -> Result<()> {
        self.focus_on(element).await?;
        match choice {
            OptionChoice::Label(label) => element.element.select_by_label(label).await?,
            OptionChoice::First => element.element.select_by_index(0).await?,
        }
        Ok(())
    }
}
