use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use kontakt_http::{HttpClient, RequestOpts};
use tracing::{debug, info};
use url::Url;

/// A loaded HTML document and the URL relative links resolve against.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: Url,
    pub html: String,
}

/// Loads documents over HTTP(S) or from disk.
#[derive(Clone)]
pub struct PageFetcher {
    client: HttpClient,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        let client = HttpClient::detached()?.with_timeout(Duration::from_secs(10));
        Ok(Self { client })
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }

    /// GET `url` and return its body as text.
    pub async fn fetch(&self, url: &str) -> Result<Document> {
        let parsed = Url::parse(url).with_context(|| format!("invalid url: {url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!("unsupported scheme for fetch: {}", parsed.scheme()));
        }
        let html = self
            .client
            .get_text(parsed.as_str(), RequestOpts::default())
            .await
            .with_context(|| format!("fetch {url}"))?;
        info!(target: "web.fetch", %url, bytes = html.len(), "fetched page");
        Ok(Document { url: parsed, html })
    }

    /// Load `source`, which is either an absolute http(s) URL or a file path.
    pub async fn load(&self, source: &str) -> Result<Document> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.fetch(source).await;
        }
        read_file(Path::new(source)).await
    }
}

async fn read_file(path: &Path) -> Result<Document> {
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let absolute = std::path::absolute(path)?;
    let url = Url::from_file_path(&absolute)
        .map_err(|_| anyhow!("cannot express {} as a file url", absolute.display()))?;
    debug!(target: "web.fetch", path = %path.display(), bytes = html.len(), "read local page");
    Ok(Document { url, html })
}
