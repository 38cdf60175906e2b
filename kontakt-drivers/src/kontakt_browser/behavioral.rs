use std::time::Duration;

use anyhow::Result;
use fantoccini::elements::Element;
use rand::rngs::OsRng;
use rand::Rng;
use tokio::time::sleep;

#[derive(Debug, Clone)]
/// Paces browser actions and types text key by key.
pub struct BehavioralEngine {
    action_delay: Duration,
}

impl BehavioralEngine {
    pub fn new(action_delay: Duration) -> Self {
        Self { action_delay }
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        sleep(jittered(min, max)).await;
    }

    /// Pause before a page-level action: between half and all of the configured delay.
    pub async fn action_pause(&self) {
        let max = self.action_delay.as_millis() as u64;
        if max > 0 {
            self.random_delay(max / 2, max).await;
        }
    }

    /// Send `text` one character at a time, waiting roughly `delay` between keys.
    pub async fn type_text(&self, element: &Element, text: &str, delay: Duration) -> Result<()> {
        let base = delay.as_millis() as u64;
        for ch in text.chars() {
            element.send_keys(&ch.to_string()).await?;
            if base > 0 {
                self.random_delay(base, base + base / 2).await;
            }
        }
        Ok(())
    }
}

fn jittered(min: u64, max: u64) -> Duration {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    Duration::from_millis(OsRng.gen_range(lo..=hi))
}
