use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};

use crate::kontakt_browser::{
    behavioral::BehavioralEngine,
    fingerprint::{session_profile, UserAgentProfile},
    launch::{capabilities, BrowserOptions},
    page::KontaktPage,
};

/// One WebDriver session. Pages handed out share the session.
pub struct KontaktDriver {
    client: Client,
    behavioral_engine: BehavioralEngine,
    profile: UserAgentProfile,
}

impl KontaktDriver {
    /// Connect to a running WebDriver service (chromedriver or geckodriver).
    pub async fn connect(options: &BrowserOptions) -> Result<Self> {
        let profile = session_profile(
            &mut rand::thread_rng(),
            options.user_agent.as_deref(),
            options.window,
        );
        let caps = capabilities(options.kind, options.headless, &profile);

        tracing::info!(
            target: "driver.session",
            url = %options.webdriver_url,
            kind = %options.kind,
            headless = options.headless,
            "connecting to webdriver"
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await
            .with_context(|| format!("webdriver at {} unreachable", options.webdriver_url))?;

        Ok(Self {
            client,
            behavioral_engine: BehavioralEngine::new(options.action_delay),
            profile,
        })
    }

    /// Page handle over this session.
    pub fn page(&self) -> KontaktPage {
        KontaktPage::new(self.client.clone(), self.behavioral_engine.clone())
    }

    pub fn profile(&self) -> &UserAgentProfile {
        &self.profile
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
