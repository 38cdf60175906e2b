#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use kontakt_common::observability::{LogConfig, LogFormat};
use kontakt_common::KontaktError;
use kontakt_forms::dom;
use kontakt_forms::page::{OptionChoice, PageTarget, Scope};
use kontakt_llm::traits::{LlmClient, LlmResponse};
use scraper::{ElementRef, Html, Selector};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "kontakt-forms-tests",
            emit_stderr: true,
            format: LogFormat::from_env("KONTAKT_LOG_FORMAT"),
            default_filter: "debug",
            log_dir: Some(std::env::temp_dir().join("kontakt-forms-tests")),
        };
        kontakt_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Element handle: the document it lives in plus its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FakeElement {
    pub scope: Scope,
    pub path: String,
}

#[derive(Default)]
struct State {
    visited: Vec<String>,
    values: HashMap<FakeElement, String>,
    typed: Vec<FakeElement>,
    clicks: Vec<String>,
}

/// In-memory page over static HTML documents.
///
/// Behaviour knobs live in the markup: `readonly`/`disabled` controls refuse
/// every write, `data-widget="custom"` refuses a direct value set but accepts
/// typing, and `data-click="fail"` refuses clicks. Typing starts from the
/// markup's `value`, cleared first as the WebDriver page does.
pub struct FakePage {
    top: String,
    frames: Vec<String>,
    navigation_error: Option<String>,
    state: Mutex<State>,
}

impl FakePage {
    pub fn new(top: &str) -> Self {
        Self {
            top: top.to_string(),
            frames: Vec::new(),
            navigation_error: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_frame(mut self, html: &str) -> Self {
        self.frames.push(html.to_string());
        self
    }

    pub fn failing_navigation(mut self, message: &str) -> Self {
        self.navigation_error = Some(message.to_string());
        self
    }

    fn doc(&self, scope: Scope) -> Result<&str> {
        match scope {
            Scope::Top => Ok(&self.top),
            Scope::Frame(i) => self
                .frames
                .get(i)
                .map(String::as_str)
                .ok_or_else(|| anyhow!("no frame {i}")),
        }
    }

    fn with_element<T>(&self, el: &FakeElement, f: impl FnOnce(ElementRef<'_>) -> T) -> Result<T> {
        let doc = Html::parse_document(self.doc(el.scope)?);
        let sel = Selector::parse(&el.path).map_err(|e| anyhow!("bad path: {e}"))?;
        let found = doc
            .select(&sel)
            .next()
            .ok_or_else(|| anyhow!("stale element {}", el.path))?;
        Ok(f(found))
    }

    fn label_of(&self, el: &FakeElement) -> String {
        self.with_element(el, |e| {
            e.value()
                .id()
                .map(|id| format!("#{id}"))
                .unwrap_or_else(|| el.path.clone())
        })
        .unwrap_or_else(|_| el.path.clone())
    }

    /// Value written into the first element matching `css` in `scope`.
    pub fn value(&self, scope: Scope, css: &str) -> Option<String> {
        let doc = Html::parse_document(self.doc(scope).ok()?);
        let sel = Selector::parse(css).ok()?;
        let path = dom::element_path(doc.select(&sel).next()?);
        let state = self.state.lock().unwrap();
        state.values.get(&FakeElement { scope, path }).cloned()
    }

    pub fn was_typed(&self, scope: Scope, css: &str) -> bool {
        let Some(doc) = self.doc(scope).ok().map(Html::parse_document) else {
            return false;
        };
        let Some(el) = Selector::parse(css).ok().and_then(|s| doc.select(&s).next()) else {
            return false;
        };
        let target = FakeElement {
            scope,
            path: dom::element_path(el),
        };
        self.state.lock().unwrap().typed.contains(&target)
    }

    /// Clicked elements, as `#id` when they have one.
    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn values_written(&self) -> usize {
        self.state.lock().unwrap().values.len()
    }

    fn writable(&self, el: &FakeElement) -> Result<bool> {
        self.with_element(el, |e| {
            let v = e.value();
            v.attr("readonly").is_none() && v.attr("disabled").is_none()
        })
    }
}

#[async_trait]
impl PageTarget for FakePage {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        if let Some(message) = &self.navigation_error {
            bail!("{message}");
        }
        self.state.lock().unwrap().visited.push(url.to_string());
        Ok(())
    }

    async fn content(&self, scope: Scope) -> Result<String> {
        self.doc(scope).map(str::to_string)
    }

    async fn frame_count(&self) -> Result<usize> {
        Ok(self.frames.len())
    }

    async fn locate(&self, scope: Scope, selector: &str) -> Result<Vec<FakeElement>> {
        let doc = Html::parse_document(self.doc(scope)?);
        let sel = Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector}: {e}"))?;
        Ok(doc
            .select(&sel)
            .map(|el| FakeElement {
                scope,
                path: dom::element_path(el),
            })
            .collect())
    }

    async fn wait_for(&self, scope: Scope, selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(!self.locate(scope, selector).await?.is_empty())
    }

    async fn attribute(&self, element: &FakeElement, name: &str) -> Result<Option<String>> {
        self.with_element(element, |e| e.value().attr(name).map(str::to_string))
    }

    async fn text(&self, element: &FakeElement) -> Result<String> {
        self.with_element(element, dom::element_text)
    }

    async fn tag_name(&self, element: &FakeElement) -> Result<String> {
        self.with_element(element, |e| e.value().name().to_string())
    }

    async fn click(&self, element: &FakeElement) -> Result<()> {
        let refuses = self.with_element(element, |e| e.value().attr("data-click") == Some("fail"))?;
        if refuses {
            bail!("element is not clickable");
        }
        let label = self.label_of(element);
        self.state.lock().unwrap().clicks.push(label);
        Ok(())
    }

    async fn scroll_into_view(&self, _element: &FakeElement) -> Result<()> {
        Ok(())
    }

    async fn set_value(&self, element: &FakeElement, value: &str) -> Result<()> {
        if !self.writable(element)? {
            bail!("element is read-only");
        }
        let custom = self.with_element(element, |e| e.value().attr("data-widget") == Some("custom"))?;
        if custom {
            bail!("element does not accept a value");
        }
        self.state
            .lock()
            .unwrap()
            .values
            .insert(element.clone(), value.to_string());
        Ok(())
    }

    async fn type_text(&self, element: &FakeElement, text: &str, _delay: Duration) -> Result<()> {
        if !self.writable(element)? {
            bail!("element is read-only");
        }
        let prefilled = self.with_element(element, |e| e.value().attr("value").unwrap_or_default().to_string())?;
        let mut state = self.state.lock().unwrap();
        let value = state.values.entry(element.clone()).or_insert(prefilled);
        value.clear();
        for key in text.chars() {
            value.push(key);
        }
        state.typed.push(element.clone());
        Ok(())
    }

    async fn select_option(&self, element: &FakeElement, choice: OptionChoice<'_>) -> Result<()> {
        let options: Vec<String> = self.with_element(element, |e| {
            let sel = Selector::parse("option").unwrap();
            e.select(&sel).map(dom::element_text).collect()
        })?;
        let picked = match choice {
            OptionChoice::Label(label) => options.into_iter().find(|o| o == label),
            OptionChoice::First => options.into_iter().next(),
        };
        let Some(picked) = picked else {
            bail!("no matching option");
        };
        self.state
            .lock()
            .unwrap()
            .values
            .insert(element.clone(), picked);
        Ok(())
    }
}

/// Oracle double returning a fixed reply and counting calls.
pub struct ScriptedOracle {
    reply: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedOracle {
    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> kontakt_common::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(LlmResponse {
                text: text.clone(),
                model: Some("scripted".into()),
                tokens_used: None,
            }),
            Err(message) => Err(KontaktError::OracleUnavailable(message.clone())),
        }
    }

    async fn health_check(&self) -> kontakt_common::Result<bool> {
        Ok(self.reply.is_ok())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
