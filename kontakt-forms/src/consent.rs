//! Cookie-consent banner dismissal ahead of form discovery.

use std::time::Duration;

use crate::catalog::{CONSENT_BANNER, CONSENT_PROBES};
use crate::page::{PageTarget, Scope};
use crate::probe;

const VANISH_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy)]
pub struct ConsentOptions {
    /// How long to wait for a banner to show up at all.
    pub appear_timeout: Duration,
    /// How long to wait for it to go away after the click.
    pub vanish_timeout: Duration,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            appear_timeout: Duration::from_millis(3_000),
            vanish_timeout: Duration::from_millis(2_000),
        }
    }
}

/// Accept a consent banner if one appears. Returns whether a control was clicked.
pub async fn dismiss<P: PageTarget>(page: &P, options: ConsentOptions) -> bool {
    let present = page
        .wait_for(Scope::Top, CONSENT_BANNER, options.appear_timeout)
        .await
        .unwrap_or(false);
    if !present {
        tracing::debug!(target: "forms.consent", "no consent banner");
        return false;
    }

    let hit = match probe::click_first(page, CONSENT_PROBES).await {
        Ok(Some(hit)) => hit,
        Ok(None) => {
            tracing::info!(target: "forms.consent", "banner present but no accept control matched");
            return false;
        }
        Err(e) => {
            tracing::warn!(target: "forms.consent", error = %e, "consent probing failed");
            return false;
        }
    };
    tracing::info!(target: "forms.consent", probe = %hit.probe, selector = %hit.selector, "consent accepted");

    let deadline = tokio::time::Instant::now() + options.vanish_timeout;
    loop {
        let still_there = page
            .locate(Scope::Top, CONSENT_BANNER)
            .await
            .map(|found| !found.is_empty())
            .unwrap_or(false);
        if !still_there {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::debug!(target: "forms.consent", "banner still visible after accept");
            break;
        }
        tokio::time::sleep(VANISH_POLL).await;
    }
    true
}
