use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use webdriver::capabilities::Capabilities;

use super::fingerprint::UserAgentProfile;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
        })
    }
}

impl FromStr for BrowserKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(BrowserKind::Chrome),
            "firefox" | "gecko" => Ok(BrowserKind::Firefox),
            other => Err(anyhow!("unknown browser kind: {other}")),
        }
    }
}

/// Session settings for [`super::driver::KontaktDriver::connect`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    pub kind: BrowserKind,
    pub headless: bool,
    pub window: Option<(u32, u32)>,
    pub user_agent: Option<String>,
    /// Base pause before navigation and between scripted actions; jittered down to half.
    pub action_delay: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            kind: BrowserKind::Chrome,
            headless: true,
            window: None,
            user_agent: None,
            action_delay: Duration::from_millis(600),
        }
    }
}

/// Chrome command-line arguments for a session profile.
pub fn chrome_arguments(headless: bool, profile: &UserAgentProfile) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        format!("--user-agent={}", profile.user_agent),
        format!("--window-size={},{}", profile.viewport.0, profile.viewport.1),
        format!("--lang={}", profile.languages.join(",")),
    ];
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

/// Firefox command-line arguments; user agent and locale go through prefs.
pub fn firefox_arguments(headless: bool, profile: &UserAgentProfile) -> Vec<String> {
    let mut args = vec![
        "-width".to_string(),
        profile.viewport.0.to_string(),
        "-height".to_string(),
        profile.viewport.1.to_string(),
    ];
    if headless {
        args.push("-headless".to_string());
    }
    args
}

/// W3C capabilities for the configured browser.
pub fn capabilities(kind: BrowserKind, headless: bool, profile: &UserAgentProfile) -> Capabilities {
    let mut caps = Capabilities::new();
    match kind {
        BrowserKind::Chrome => {
            caps.insert("browserName".to_string(), json!("chrome"));
            caps.insert(
                "goog:chromeOptions".to_string(),
                json!({
                    "args": chrome_arguments(headless, profile),
                    "excludeSwitches": ["enable-automation"],
                }),
            );
        }
        BrowserKind::Firefox => {
            caps.insert("browserName".to_string(), json!("firefox"));
            caps.insert(
                "moz:firefoxOptions".to_string(),
                json!({
                    "args": firefox_arguments(headless, profile),
                    "prefs": {
                        "general.useragent.override": profile.user_agent,
                        "intl.accept_languages": profile.languages.join(","),
                    },
                }),
            );
        }
    }
    caps
}
