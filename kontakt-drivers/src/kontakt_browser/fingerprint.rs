use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const FALLBACK_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// User agent, viewport and locale presented to visited sites.
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub languages: Vec<String>,
}

impl UserAgentProfile {
    fn desktop(user_agent: &str, viewport: (u32, u32)) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            viewport,
            languages: vec!["de-DE".to_string(), "de".to_string(), "en".to_string()],
        }
    }
}

/// Small pool of plausible desktop profiles; one is chosen per session.
pub fn desktop_profiles() -> Vec<UserAgentProfile> {
    vec![
        UserAgentProfile::desktop(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            (1920, 1080),
        ),
        UserAgentProfile::desktop(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            (1440, 900),
        ),
        UserAgentProfile::desktop(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
            (1366, 768),
        ),
    ]
}

/// Pick a session profile. Explicit user agent and window size win over the pool.
pub fn session_profile<R: Rng + ?Sized>(
    rng: &mut R,
    user_agent: Option<&str>,
    window: Option<(u32, u32)>,
) -> UserAgentProfile {
    let pool = desktop_profiles();
    let mut profile = pool
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| UserAgentProfile::desktop(FALLBACK_AGENT, (1280, 800)));
    if let Some(agent) = user_agent.filter(|a| !a.trim().is_empty()) {
        profile.user_agent = agent.to_string();
    }
    if let Some(window) = window {
        profile.viewport = window;
    }
    profile
}
