//! Link metadata from OpenGraph tags and the page title.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;
use crate::metadata::platform::{detect_platform, suggest_tags_from_title};

const MAX_TITLE_CHARS: usize = 200;
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Metadata describing a link, used to prefill a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMetadata {
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub platform: String,
    pub content_type: String,
    pub suggested_tags: Vec<String>,
}

impl UrlMetadata {
    /// Metadata derived from the URL alone: the URL as title and the detected platform.
    pub fn fallback(url: &str) -> Self {
        let (platform, content_type) = detect_platform(url);
        Self {
            title: url.to_string(),
            thumbnail_url: None,
            platform: platform.to_string(),
            content_type: content_type.to_string(),
            suggested_tags: Vec::new(),
        }
    }

    /// Metadata from a fetched HTML page.
    pub fn from_html(url: &str, html: &str) -> Self {
        let mut metadata = Self::fallback(url);

        if let Some(title) = extract_title(html)
            .map(|t| t.trim().chars().take(MAX_TITLE_CHARS).collect::<String>())
            .filter(|t| !t.is_empty())
        {
            metadata.suggested_tags = suggest_tags_from_title(&title);
            metadata.title = title;
        }
        metadata.thumbnail_url = Url::parse(url)
            .ok()
            .and_then(|base| extract_image(html, &base));

        metadata
    }
}

/// Looks up metadata for a URL. Never fails: errors degrade to [`UrlMetadata::fallback`].
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> UrlMetadata;
}

/// [`MetadataFetcher`] that downloads the page over HTTP(S).
pub struct HttpMetadataFetcher {
    client: Client,
}

impl HttpMetadataFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            debug!("Skipping non-HTTP URL: {}", url);
            return None;
        }

        let response = match self.client.get(parsed).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to fetch URL: {} - {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("URL returned non-success status: {} - {}", url, response.status());
            return None;
        }

        match read_capped(response, MAX_BODY_BYTES).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Failed to read response body: {} - {}", url, e);
                None
            }
        }
    }
}

/// Read at most `cap` bytes of the body; the rest is never downloaded.
async fn read_capped(mut response: Response, cap: usize) -> Result<String, reqwest::Error> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = cap - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> UrlMetadata {
        match self.fetch_html(url).await {
            Some(html) => UrlMetadata::from_html(url, &html),
            None => UrlMetadata::fallback(url),
        }
    }
}

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>([^<]*)</title>").expect("title pattern"));

static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']og:title["'][^>]+content=["']([^"']*)["']"#)
        .expect("og:title pattern")
});

static OG_TITLE_RE2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+content=["']([^"']*)["'][^>]+property=["']og:title["']"#)
        .expect("og:title pattern")
});

static OG_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']*)["']"#)
        .expect("og:image pattern")
});

static OG_IMAGE_RE2: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+content=["']([^"']*)["'][^>]+property=["']og:image["']"#)
        .expect("og:image pattern")
});

fn extract_title(html: &str) -> Option<String> {
    let og = OG_TITLE_RE
        .captures(html)
        .or_else(|| OG_TITLE_RE2.captures(html))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .filter(|t| !t.trim().is_empty());

    let raw = match og {
        Some(t) => t,
        None => TITLE_RE.captures(html)?.get(1)?.as_str(),
    };
    Some(decode_html_entities(raw))
}

fn extract_image(html: &str, base: &Url) -> Option<String> {
    let cap = OG_IMAGE_RE
        .captures(html)
        .or_else(|| OG_IMAGE_RE2.captures(html))?;
    let image = cap.get(1)?.as_str().trim();
    if image.is_empty() {
        return None;
    }
    base.join(&decode_html_entities(image)).ok().map(String::from)
}

fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
