// src/text.rs
//! Text sanitation shared by every source adapter: CDATA unwrapping, HTML
//! stripping, entity decoding, whitespace collapsing, and the stop-word
//! tag extractor.

use std::collections::HashSet;

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

/// Sanitize one free-text field coming off the wire.
///
/// Order matters: CDATA wrappers come off first, entities are decoded before
/// tag stripping so escaped markup does not survive, then whitespace is
/// collapsed.
pub fn sanitize(s: &str) -> String {
    let mut out = unwrap_cdata(s);

    out = html_escape::decode_html_entities(&out).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

fn unwrap_cdata(s: &str) -> String {
    static RE_CDATA: OnceCell<Regex> = OnceCell::new();
    let re = RE_CDATA.get_or_init(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
    re.replace_all(s, "$1").to_string()
}

/// First `<img src="...">` inside an HTML fragment, if any. Runs on the raw
/// (pre-sanitation) markup.
pub fn first_img_src(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    let re = RE_IMG
        .get_or_init(|| Regex::new(r#"(?is)<img[^>]+src\s*=\s*["']([^"']+)["']"#).unwrap());
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "after", "again", "also", "amid", "been", "before", "being", "between", "could",
        "does", "down", "during", "every", "from", "have", "here", "into", "just", "like", "more",
        "most", "only", "other", "over", "said", "same", "says", "should", "since", "some", "such",
        "than", "that", "their", "them", "then", "there", "these", "they", "this", "today", "under",
        "until", "view", "were", "what", "when", "where", "which", "while", "will", "with", "would",
        "your",
    ]
    .into_iter()
    .collect()
});

/// Derive up to five tags from title + summary: lowercase, strip
/// punctuation, drop stop-words and short tokens, keep first-seen order.
pub fn extract_tags(title: &str, summary: &str) -> Vec<String> {
    let joined = format!("{} {}", title, summary).to_lowercase();

    static RE_PUNCT: OnceCell<Regex> = OnceCell::new();
    let re = RE_PUNCT.get_or_init(|| Regex::new(r"[^\w\s]").unwrap());
    let cleaned = re.replace_all(&joined, " ");

    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(5);
    for token in cleaned.split_whitespace() {
        if token.len() <= 3 || STOP_WORDS.contains(token) {
            continue;
        }
        if seen.insert(token.to_string()) {
            tags.push(token.to_string());
            if tags.len() == 5 {
                break;
            }
        }
    }
    tags
}

/// Lowercase slug used in synthesized article ids.
pub fn slug(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
