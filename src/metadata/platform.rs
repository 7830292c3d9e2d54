use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Domains mapped to `(platform, content_type)`. First match wins.
const PLATFORMS: &[(&str, &str, &str)] = &[
    ("youtube.com", "YouTube", "video"),
    ("youtu.be", "YouTube", "video"),
    ("twitter.com", "X", "post"),
    ("x.com", "X", "post"),
    ("instagram.com", "Instagram", "post"),
    ("tiktok.com", "TikTok", "video"),
    ("linkedin.com", "LinkedIn", "post"),
    ("medium.com", "Medium", "article"),
    ("reddit.com", "Reddit", "post"),
    ("github.com", "GitHub", "article"),
    ("substack.com", "Substack", "article"),
];

pub const DEFAULT_PLATFORM: &str = "Web";
pub const DEFAULT_CONTENT_TYPE: &str = "article";

const MAX_TITLE_TAGS: usize = 5;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "it", "this", "that", "how", "what", "why", "when", "where", "who",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("word pattern is valid"));

/// Guess the source platform and content type of `url` from its host.
///
/// A host matches a domain when it equals it or is one of its subdomains.
/// Unparseable URLs and unknown hosts are `("Web", "article")`.
pub fn detect_platform(url: &str) -> (&'static str, &'static str) {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default();

    PLATFORMS
        .iter()
        .find(|(domain, _, _)| host_in_domain(&host, domain))
        .map(|(_, platform, content_type)| (*platform, *content_type))
        .unwrap_or((DEFAULT_PLATFORM, DEFAULT_CONTENT_TYPE))
}

fn host_in_domain(host: &str, domain: &str) -> bool {
    host.strip_suffix(domain)
        .is_some_and(|rest| rest.is_empty() || rest.ends_with('.'))
}

/// Up to five distinct keywords from a title, lowercased, in title order.
pub fn suggest_tags_from_title(title: &str) -> Vec<String> {
    let lowered = title.to_lowercase();
    let mut tags: Vec<String> = Vec::new();

    for word in WORD_RE.find_iter(&lowered).map(|m| m.as_str()) {
        if STOP_WORDS.contains(&word) || tags.iter().any(|t| t == word) {
            continue;
        }
        tags.push(word.to_string());
        if tags.len() == MAX_TITLE_TAGS {
            break;
        }
    }

    tags
}
