use std::collections::BTreeMap;
use std::path::PathBuf;

use kontakt_common::OutputFormat;
use kontakt_forms::{ApplicantProfile, FormField, VocabularyEntry};
use serde::Deserialize;

use crate::lenient;

/// Root of `kontakt.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KontaktConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub applicant: ApplicantProfile,
    #[serde(default)]
    pub browser: BrowserSettings,
    /// Field-mapping oracle; absent means heuristic matching only.
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl KontaktConfig {
    /// Oracle settings when one is configured and enabled.
    pub fn active_oracle(&self) -> Option<&OracleConfig> {
        self.oracle.as_ref().filter(|_| self.matching.use_oracle)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// `chrome` or `firefox`.
    #[serde(default = "default_browser_kind")]
    pub kind: String,
    #[serde(default = "default_true", deserialize_with = "lenient::parse")]
    pub headless: bool,
    #[serde(default = "default_typing_delay_ms", deserialize_with = "lenient::parse")]
    pub typing_delay_ms: u64,
    #[serde(default = "default_action_delay_ms", deserialize_with = "lenient::parse")]
    pub action_delay_ms: u64,
    #[serde(default)]
    pub window: Option<WindowSize>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            kind: default_browser_kind(),
            headless: true,
            typing_delay_ms: default_typing_delay_ms(),
            action_delay_ms: default_action_delay_ms(),
            window: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowSize {
    #[serde(deserialize_with = "lenient::parse")]
    pub width: u32,
    #[serde(deserialize_with = "lenient::parse")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(flatten)]
    pub llm: LlmConfig,
    /// Page HTML beyond this many characters is cut before prompting.
    #[serde(default, deserialize_with = "lenient::parse_opt")]
    pub max_html_chars: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        model: String,
        auth_token: String,
        #[serde(default, deserialize_with = "lenient::parse_opt")]
        temperature: Option<f32>,
        #[serde(default, deserialize_with = "lenient::parse_opt")]
        max_tokens: Option<u32>,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
    Ollama {
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
        #[serde(default, deserialize_with = "lenient::parse_opt")]
        temperature: Option<f32>,
        #[serde(default, deserialize_with = "lenient::parse_opt")]
        max_tokens: Option<u32>,
    },
}

impl LlmConfig {
    pub fn model(&self) -> &str {
        match self {
            LlmConfig::Openai { model, .. } | LlmConfig::Ollama { model, .. } => model,
        }
    }

    pub fn temperature(&self) -> Option<f32> {
        match self {
            LlmConfig::Openai { temperature, .. } | LlmConfig::Ollama { temperature, .. } => {
                *temperature
            }
        }
    }

    pub fn max_tokens(&self) -> Option<u32> {
        match self {
            LlmConfig::Openai { max_tokens, .. } | LlmConfig::Ollama { max_tokens, .. } => {
                *max_tokens
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_true", deserialize_with = "lenient::parse")]
    pub use_oracle: bool,
    /// Extra synonyms per role, appended after the built-in ones.
    #[serde(default)]
    pub vocabulary: BTreeMap<FormField, VocabularyEntry>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            use_oracle: true,
            vocabulary: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSettings {
    /// `false` fills forms without submitting them.
    #[serde(default, deserialize_with = "lenient::parse")]
    pub submit: bool,
    #[serde(default = "default_true", deserialize_with = "lenient::parse")]
    pub dismiss_consent: bool,
    #[serde(default = "default_true", deserialize_with = "lenient::parse")]
    pub site_overrides: bool,
    #[serde(default = "default_settle_timeout_ms", deserialize_with = "lenient::parse")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_consent_timeout_ms", deserialize_with = "lenient::parse")]
    pub consent_timeout_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            submit: false,
            dismiss_consent: true,
            site_overrides: true,
            settle_timeout_ms: default_settle_timeout_ms(),
            consent_timeout_ms: default_consent_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_true() -> bool {
    true
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_browser_kind() -> String {
    "chrome".into()
}
fn default_typing_delay_ms() -> u64 {
    15
}
fn default_action_delay_ms() -> u64 {
    600
}
fn default_settle_timeout_ms() -> u64 {
    5_000
}
fn default_consent_timeout_ms() -> u64 {
    3_000
}
fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".into()
}
