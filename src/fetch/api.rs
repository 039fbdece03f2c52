// src/fetch/api.rs
//! JSON API adapter. Each named upstream has its own normalizer in a small
//! registry; all of them emit the canonical article shape. Broad-keyword
//! upstreams additionally pass through the crypto-term gate after the
//! fetch.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::article::{
    lookback_window, Article, Engagement, NewsQuery, SortKey, DEFAULT_RELEVANCE_SCORE,
};
use crate::catalog::SourceDescriptor;
use crate::enrich::matches_crypto_terms;
use crate::fetch::parse_published;
use crate::text::{extract_tags, sanitize, slug};

/// Keyword set sent to search-style upstreams.
const SEARCH_KEYWORDS: &[&str] = &[
    "bitcoin",
    "ethereum",
    "cryptocurrency",
    "blockchain",
    "defi",
    "nft",
];

/// Upstreams with a registered normalizer. Selection is by descriptor
/// name; an unknown API source is a failure, not a silent skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Normalizer {
    CryptoPanic,
    NewsData,
    BlockBeat,
}

fn normalizer_for(name: &str) -> Option<Normalizer> {
    match name.to_ascii_lowercase().as_str() {
        "cryptopanic" => Some(Normalizer::CryptoPanic),
        "newsdata" => Some(Normalizer::NewsData),
        "blockbeat" => Some(Normalizer::BlockBeat),
        _ => None,
    }
}

/// Deterministic id for upstreams that supply a URL but no durable id:
/// order-dependent rolling hash over source name + URL, so the same URL
/// from the same source always maps to the same id.
pub fn derive_article_id(source: &str, url: &str) -> String {
    let mut h: u64 = 0;
    for b in source.bytes().chain(url.bytes()) {
        h = h.wrapping_mul(31).wrapping_add(u64::from(b));
    }
    format!("{}-{:x}", slug(source), h)
}

pub struct ApiFetcher {
    client: reqwest::Client,
}

impl ApiFetcher {
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
        query: &NewsQuery,
    ) -> Result<Vec<Article>> {
        let limit = query.clamped_limit();
        match normalizer_for(&descriptor.name) {
            Some(Normalizer::CryptoPanic) => self.fetch_cryptopanic(descriptor, query, limit).await,
            Some(Normalizer::NewsData) => self.fetch_newsdata(descriptor, query, limit).await,
            Some(Normalizer::BlockBeat) => self.fetch_blockbeat(descriptor, query, limit).await,
            None => bail!("no normalizer registered for api source '{}'", descriptor.name),
        }
    }

    // ---- shape 1: POST search API, results nested under "results" ----

    async fn fetch_cryptopanic(
        &self,
        descriptor: &SourceDescriptor,
        query: &NewsQuery,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let mut body = json!({
            "keywords": SEARCH_KEYWORDS,
            "sortBy": cryptopanic_sort(query.sort_by),
            "size": limit,
        });
        if let Some(window) = lookback_window(&query.time_filter) {
            body["from"] = json!((Utc::now() - window).to_rfc3339());
        }

        let mut request = self.client.post(&descriptor.url).json(&body);
        if let Some(credential) = descriptor.credential() {
            request = request.bearer_auth(credential);
        }

        let response: CryptoPanicResponse = request
            .send()
            .await
            .with_context(|| format!("requesting api {}", descriptor.name))?
            .error_for_status()
            .with_context(|| format!("api {} returned non-success", descriptor.name))?
            .json()
            .await
            .with_context(|| format!("decoding api {} response", descriptor.name))?;

        let now = Utc::now();
        Ok(response
            .results
            .into_iter()
            .filter_map(|post| {
                let engagement = post
                    .votes
                    .map(|v| Engagement {
                        likes: v.liked,
                        views: v.saved,
                        comments: v.comments,
                    })
                    .unwrap_or_default();
                normalize_api_item(
                    descriptor,
                    now,
                    post.title.as_deref(),
                    post.url.as_deref(),
                    post.description.as_deref(),
                    None,
                    post.published_at.as_deref().or(post.created_at.as_deref()),
                    post.image.as_deref(),
                    post.source.and_then(|s| s.title),
                    engagement,
                )
            })
            .collect())
    }

    // ---- shape 2: GET query-string API with a status field ----

    async fn fetch_newsdata(
        &self,
        descriptor: &SourceDescriptor,
        query: &NewsQuery,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let window =
            lookback_window(&query.time_filter).unwrap_or_else(|| chrono::Duration::days(7));
        let from = (Utc::now() - window).format("%Y-%m-%d").to_string();
        let page_size = limit.clamp(10, 25);

        let mut request = self.client.get(&descriptor.url).query(&[
            ("q", SEARCH_KEYWORDS.join(" OR ")),
            ("language", "en".to_string()),
            ("pageSize", page_size.to_string()),
            ("sortBy", newsdata_sort(query.sort_by).to_string()),
            ("from", from),
        ]);
        if let Some(credential) = descriptor.credential() {
            request = request.query(&[("apikey", credential)]);
        }

        let response: NewsDataResponse = request
            .send()
            .await
            .with_context(|| format!("requesting api {}", descriptor.name))?
            .error_for_status()
            .with_context(|| format!("api {} returned non-success", descriptor.name))?
            .json()
            .await
            .with_context(|| format!("decoding api {} response", descriptor.name))?;

        if response.status.as_deref() != Some("ok") {
            tracing::warn!(
                target: "fetch",
                source = %descriptor.name,
                status = response.status.as_deref().unwrap_or("<missing>"),
                "upstream reported non-ok status, treating as zero results"
            );
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let articles: Vec<Article> = response
            .articles
            .into_iter()
            .filter_map(|item| {
                normalize_api_item(
                    descriptor,
                    now,
                    item.title.as_deref(),
                    item.link.as_deref(),
                    item.description.as_deref(),
                    item.content.as_deref(),
                    item.pub_date.as_deref(),
                    item.image_url.as_deref(),
                    item.creator.and_then(|c| c.into_iter().next()),
                    Engagement::default(),
                )
            })
            // Boolean keyword queries cast a wide net; re-validate against
            // the crypto vocabulary before anything reaches the pipeline.
            .filter(matches_crypto_terms)
            .collect();

        Ok(articles)
    }

    // ---- shape 3: GET topic API, array or single object ----

    async fn fetch_blockbeat(
        &self,
        descriptor: &SourceDescriptor,
        query: &NewsQuery,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let topic = if query.category.eq_ignore_ascii_case("all") {
            "crypto".to_string()
        } else {
            query.category.to_lowercase()
        };

        let value: Value = self
            .client
            .get(&descriptor.url)
            .query(&[("topic", topic), ("limit", limit.to_string())])
            .send()
            .await
            .with_context(|| format!("requesting api {}", descriptor.name))?
            .error_for_status()
            .with_context(|| format!("api {} returned non-success", descriptor.name))?
            .json()
            .await
            .with_context(|| format!("decoding api {} response", descriptor.name))?;

        // The upstream answers with an array normally but a bare object
        // for single-story responses; coerce both into one shape.
        let items: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Object(_) => vec![value],
            other => bail!(
                "api {} returned unexpected payload type: {}",
                descriptor.name,
                type_name(&other)
            ),
        };

        let now = Utc::now();
        Ok(items
            .into_iter()
            .take(limit)
            .filter_map(|item| {
                let get = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
                normalize_api_item(
                    descriptor,
                    now,
                    get("title").as_deref(),
                    get("url").as_deref().or(get("link").as_deref()),
                    get("summary").as_deref().or(get("description").as_deref()),
                    get("body").as_deref(),
                    get("published_at").as_deref().or(get("date").as_deref()),
                    get("image").as_deref(),
                    get("author"),
                    Engagement::default(),
                )
            })
            .collect())
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Caller vocabulary → this upstream's sort enum.
fn cryptopanic_sort(key: SortKey) -> &'static str {
    match key {
        SortKey::Engagement | SortKey::Trending => "socialScore",
        SortKey::Date => "date",
        SortKey::Relevance => "relevance",
    }
}

fn newsdata_sort(key: SortKey) -> &'static str {
    match key {
        SortKey::Engagement | SortKey::Trending => "popularity",
        SortKey::Date => "publishedAt",
        SortKey::Relevance => "relevancy",
    }
}

/// Map one upstream record into the canonical shape. Records without a
/// title or URL are dropped here and never reach the pipeline.
#[allow(clippy::too_many_arguments)]
fn normalize_api_item(
    descriptor: &SourceDescriptor,
    now: DateTime<Utc>,
    title: Option<&str>,
    url: Option<&str>,
    summary: Option<&str>,
    content: Option<&str>,
    published: Option<&str>,
    image_url: Option<&str>,
    author: Option<String>,
    engagement: Engagement,
) -> Option<Article> {
    let title = sanitize(title.unwrap_or(""));
    let url = url.unwrap_or("").trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    let summary = sanitize(summary.unwrap_or(""));
    let content = content
        .map(sanitize)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| summary.clone());
    let published_at = published.and_then(parse_published).unwrap_or(now);
    let tags = extract_tags(&title, &summary);
    let excerpt: String = summary.chars().take(200).collect();

    let mut categories = std::collections::BTreeSet::new();
    categories.insert(descriptor.category.to_lowercase());

    Some(Article {
        id: derive_article_id(&descriptor.name, &url),
        title,
        url,
        source: descriptor.name.clone(),
        source_id: None,
        published_at,
        summary,
        content,
        excerpt,
        categories,
        tags,
        image_url: image_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        author: author.map(|a| sanitize(&a)).filter(|a| !a.is_empty()),
        relevance_score: DEFAULT_RELEVANCE_SCORE,
        engagement,
        source_priority: descriptor.priority,
        processing_timestamp: now,
    })
}

// ---- wire shapes ----

#[derive(Debug, Deserialize)]
struct CryptoPanicResponse {
    #[serde(default)]
    results: Vec<CryptoPanicPost>,
}

#[derive(Debug, Deserialize)]
struct CryptoPanicPost {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    created_at: Option<String>,
    image: Option<String>,
    source: Option<CryptoPanicSource>,
    votes: Option<CryptoPanicVotes>,
}

#[derive(Debug, Deserialize)]
struct CryptoPanicSource {
    title: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CryptoPanicVotes {
    #[serde(default)]
    liked: u64,
    #[serde(default)]
    saved: u64,
    #[serde(default)]
    comments: u64,
}

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    status: Option<String>,
    #[serde(default, alias = "results")]
    articles: Vec<NewsDataArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    image_url: Option<String>,
    #[serde(default)]
    creator: Option<Vec<String>>,
}
