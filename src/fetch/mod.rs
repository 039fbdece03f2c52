// src/fetch/mod.rs
//! Source adapters. One fetcher per descriptor kind, both surfacing the
//! same contract: a `Result<Vec<Article>>` the coordinator wraps into a
//! `FetchOutcome`. Nothing in here panics on bad upstream data.

pub mod api;
pub mod feed;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::article::{Article, NewsQuery};
use crate::catalog::{SourceDescriptor, SourceKind};

pub use api::ApiFetcher;
pub use feed::FeedFetcher;

/// Per-source fetch budget; the coordinator wraps each fetch in this
/// timeout and the reqwest clients carry it as well.
pub const PER_SOURCE_TIMEOUT: Duration = Duration::from_secs(12);

pub const USER_AGENT: &str = concat!("crypto-news-aggregator/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, descriptor: &SourceDescriptor, query: &NewsQuery)
        -> Result<Vec<Article>>;
}

/// Production fetcher: dispatches on descriptor kind.
pub struct DefaultFetcher {
    feed: FeedFetcher,
    api: ApiFetcher,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        let client = build_client();
        Self {
            feed: FeedFetcher::with_client(client.clone()),
            api: ApiFetcher::with_client(client),
        }
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for DefaultFetcher {
    async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
        query: &NewsQuery,
    ) -> Result<Vec<Article>> {
        match descriptor.kind {
            SourceKind::Feed => self.feed.fetch(descriptor).await,
            SourceKind::Api => self.api.fetch(descriptor, query).await,
        }
    }
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(PER_SOURCE_TIMEOUT)
        .build()
        .expect("reqwest client build")
}

/// Best-effort publish-date parsing: RFC 2822 (the RSS norm), RFC 3339
/// (Atom and most JSON APIs), then a couple of bare formats some upstreams
/// emit. `None` means the caller substitutes the fetch-time clock.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        let unix = dt.to_offset(UtcOffset::UTC).unix_timestamp();
        return DateTime::<Utc>::from_timestamp(unix, 0);
    }
    // The `time` parser is strict about obsolete zone names ("GMT", "UT")
    // that real feeds still emit; chrono's RFC 2822 parser accepts them.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    None
}
