// src/fetch/feed.rs
//! RSS/Atom feed adapter. Deserializes `<item>` blocks first and falls
//! back to Atom `<entry>` blocks, producing the same canonical shape
//! either way.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::article::{Article, Engagement, DEFAULT_RELEVANCE_SCORE};
use crate::catalog::SourceDescriptor;
use crate::fetch::parse_published;
use crate::text::{extract_tags, first_img_src, sanitize, slug};

// ---- RSS wire shapes ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "date")]
    dc_date: Option<String>,
    author: Option<String>,
    #[serde(rename = "creator")]
    dc_creator: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<TextValue>,
    guid: Option<TextValue>,
    enclosure: Option<Enclosure>,
    #[serde(rename = "content")]
    media_content: Option<MediaRef>,
    #[serde(rename = "thumbnail")]
    media_thumbnail: Option<MediaRef>,
}

/// Element whose text we want regardless of any attributes on it
/// (`<guid isPermaLink=...>`, `<category domain=...>`).
#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaRef {
    #[serde(rename = "@url")]
    url: Option<String>,
}

// ---- Atom wire shapes ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<TextValue>,
    id: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextValue>,
    content: Option<TextValue>,
    author: Option<AtomAuthor>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

pub struct FeedFetcher {
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, descriptor: &SourceDescriptor) -> Result<Vec<Article>> {
        let body = self
            .client
            .get(&descriptor.url)
            .send()
            .await
            .with_context(|| format!("requesting feed {}", descriptor.name))?
            .error_for_status()
            .with_context(|| format!("feed {} returned non-success", descriptor.name))?
            .text()
            .await
            .with_context(|| format!("reading feed body from {}", descriptor.name))?;

        parse_feed(&body, descriptor)
    }
}

/// Parse one feed document. RSS `<item>` blocks win; zero items (or an
/// RSS parse failure) falls through to the Atom `<entry>` path.
pub fn parse_feed(xml: &str, descriptor: &SourceDescriptor) -> Result<Vec<Article>> {
    let t0 = std::time::Instant::now();
    let now = Utc::now();
    let xml = &scrub_html_entities_for_xml(xml);

    let articles: Vec<Article> = match from_str::<Rss>(xml) {
        Ok(rss) if !rss.channel.items.is_empty() => rss
            .channel
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| article_from_rss(item, descriptor, idx, now))
            .collect(),
        _ => {
            // Zero <item> blocks or not RSS at all: try the Atom shape,
            // but only for documents that look like a feed.
            anyhow::ensure!(
                xml.contains("<feed") || xml.contains("<rss") || xml.contains("<channel"),
                "feed {} is neither rss nor atom",
                descriptor.name
            );
            let atom: AtomFeed = from_str(xml)
                .with_context(|| format!("parsing feed {} as atom", descriptor.name))?;
            atom.entries
                .into_iter()
                .enumerate()
                .filter_map(|(idx, entry)| article_from_atom(entry, descriptor, idx, now))
                .collect()
        }
    };

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(articles)
}

fn article_from_rss(
    item: Item,
    descriptor: &SourceDescriptor,
    idx: usize,
    now: DateTime<Utc>,
) -> Option<Article> {
    let title = sanitize(item.title.as_deref()?);
    let url = item.link.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    // Prefer the rich encoded body over the plain description.
    let raw_description = item.description.as_deref().unwrap_or("");
    let raw_content = item
        .content_encoded
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(raw_description);

    let image_url = first_img_src(raw_description)
        .or_else(|| first_img_src(raw_content))
        .or_else(|| item.media_content.and_then(|m| m.url))
        .or_else(|| item.media_thumbnail.and_then(|m| m.url))
        .or_else(|| {
            item.enclosure.and_then(|e| {
                let is_image = e.mime.as_deref().is_none_or(|m| m.starts_with("image"));
                if is_image {
                    e.url
                } else {
                    None
                }
            })
        });

    let published_at = item
        .pub_date
        .as_deref()
        .or(item.dc_date.as_deref())
        .and_then(parse_published)
        .unwrap_or(now);

    let author = item
        .author
        .as_deref()
        .or(item.dc_creator.as_deref())
        .map(sanitize)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| descriptor.name.clone());

    let raw_categories: Vec<String> = item
        .categories
        .into_iter()
        .filter_map(|c| c.value)
        .collect();
    let categories = normalize_categories(&raw_categories, &descriptor.category);

    let summary = sanitize(raw_description);
    let content = sanitize(raw_content);
    let guid = item.guid.and_then(|g| g.value).map(|g| g.trim().to_string());

    Some(build_article(
        descriptor,
        idx,
        now,
        title,
        url,
        guid,
        published_at,
        summary,
        content,
        categories,
        image_url,
        Some(author),
    ))
}

fn article_from_atom(
    entry: Entry,
    descriptor: &SourceDescriptor,
    idx: usize,
    now: DateTime<Utc>,
) -> Option<Article> {
    let title = sanitize(entry.title.as_ref().and_then(|t| t.value.as_deref())?);

    // Prefer the alternate link; fall back to the first href present.
    let url = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .and_then(|l| l.href.clone())
        .or_else(|| entry.links.iter().find_map(|l| l.href.clone()))
        .unwrap_or_default()
        .trim()
        .to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    let raw_summary = entry
        .summary
        .as_ref()
        .and_then(|t| t.value.as_deref())
        .unwrap_or("");
    let raw_content = entry
        .content
        .as_ref()
        .and_then(|t| t.value.as_deref())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(raw_summary);

    let image_url = first_img_src(raw_summary).or_else(|| first_img_src(raw_content));

    let published_at = entry
        .published
        .as_deref()
        .or(entry.updated.as_deref())
        .and_then(parse_published)
        .unwrap_or(now);

    let author = entry
        .author
        .and_then(|a| a.name)
        .map(|n| sanitize(&n))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| descriptor.name.clone());

    let raw_categories: Vec<String> = entry
        .categories
        .into_iter()
        .filter_map(|c| c.term)
        .collect();
    let categories = normalize_categories(&raw_categories, &descriptor.category);

    let summary = sanitize(raw_summary);
    let content = sanitize(raw_content);
    let guid = entry.id.map(|g| g.trim().to_string()).filter(|g| !g.is_empty());

    Some(build_article(
        descriptor,
        idx,
        now,
        title,
        url,
        guid,
        published_at,
        summary,
        content,
        categories,
        image_url,
        Some(author),
    ))
}

/// Feeds routinely embed HTML entities the XML parser does not know;
/// rewrite the common ones before deserializing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "…")
}

/// Split on the common separators, trim, lowercase, dedupe; empty input
/// falls back to the feed's configured category.
fn normalize_categories(
    raw: &[String],
    fallback: &str,
) -> std::collections::BTreeSet<String> {
    let mut out = std::collections::BTreeSet::new();
    for value in raw {
        for part in value.split(|c| matches!(c, ',' | ';' | '|')) {
            let cleaned = sanitize(part).to_lowercase();
            if !cleaned.is_empty() {
                out.insert(cleaned);
            }
        }
    }
    if out.is_empty() {
        out.insert(fallback.to_lowercase());
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn build_article(
    descriptor: &SourceDescriptor,
    idx: usize,
    now: DateTime<Utc>,
    title: String,
    url: String,
    guid: Option<String>,
    published_at: DateTime<Utc>,
    summary: String,
    content: String,
    categories: std::collections::BTreeSet<String>,
    image_url: Option<String>,
    author: Option<String>,
) -> Article {
    // Guid when the feed supplies one, else positional; not stable across
    // runs, downstream dedup absorbs that.
    let id = guid
        .clone()
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| {
            format!("{}-{}-{}", slug(&descriptor.name), idx, now.timestamp_millis())
        });

    let tags = extract_tags(&title, &summary);
    let excerpt: String = summary.chars().take(200).collect();

    Article {
        id,
        title,
        url,
        source: descriptor.name.clone(),
        source_id: guid,
        published_at,
        summary,
        content,
        excerpt,
        categories,
        tags,
        image_url,
        author,
        relevance_score: DEFAULT_RELEVANCE_SCORE,
        engagement: Engagement::default(),
        source_priority: descriptor.priority,
        processing_timestamp: now,
    }
}
