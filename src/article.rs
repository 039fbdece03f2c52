// src/article.rs
//! Canonical article schema and per-cycle result types.
//!
//! Every source adapter, whatever its wire format, produces `Article`
//! values in exactly this shape. Records missing a title or a URL are
//! discarded during normalization and never reach the pipeline.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engagement counters as reported by the upstream, zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub views: u64,
    pub comments: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Always valid: falls back to the fetch-time clock when the source
    /// omits a date or supplies one we cannot parse.
    pub published_at: DateTime<Utc>,
    pub summary: String,
    pub content: String,
    pub excerpt: String,
    pub categories: BTreeSet<String>,
    /// At most five, extracted from title + summary.
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Clamped to [0.0, 1.0]; 0.5 until a scorer has run.
    pub relevance_score: f64,
    pub engagement: Engagement,
    pub source_priority: u8,
    pub processing_timestamp: DateTime<Utc>,
}

pub const DEFAULT_RELEVANCE_SCORE: f64 = 0.5;

impl Article {
    /// Keep the score inside its documented range whatever a scorer did.
    pub fn clamp_score(&mut self) {
        self.relevance_score = self.relevance_score.clamp(0.0, 1.0);
    }
}

/// Per-source result of one fetch attempt. Every attempted source yields
/// exactly one outcome, including on timeout; adapters never bubble errors
/// past this boundary.
#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        source: String,
        articles: Vec<Article>,
        elapsed: Duration,
    },
    Failure {
        source: String,
        error: String,
        elapsed: Duration,
    },
}

impl FetchOutcome {
    pub fn source(&self) -> &str {
        match self {
            FetchOutcome::Success { source, .. } => source,
            FetchOutcome::Failure { source, .. } => source,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// The cached snapshot of one full pipeline run. Replaced wholesale on TTL
/// expiry; there is no partial invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub articles: Vec<Article>,
    pub fetched_at: DateTime<Utc>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
}

/// Sort key vocabulary accepted from callers. `Trending` is aliased to the
/// engagement ordering locally; upstreams get their own translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Relevance,
    Date,
    Engagement,
    Trending,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Relevance
    }
}

impl SortKey {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" | "published" | "newest" => SortKey::Date,
            "engagement" => SortKey::Engagement,
            "trending" => SortKey::Trending,
            _ => SortKey::Relevance,
        }
    }
}

/// Optional personalization input for the relevance scorer. The scoring
/// model itself lives behind the `RelevanceScorer` trait.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub interests: Vec<String>,
}

/// Caller-facing request, as parsed from the query string.
#[derive(Debug, Clone)]
pub struct NewsQuery {
    pub limit: usize,
    pub category: String,
    pub time_filter: String,
    pub sort_by: SortKey,
    pub user_profile: Option<UserProfile>,
}

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 100;

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            category: "all".to_string(),
            time_filter: "24h".to_string(),
            sort_by: SortKey::default(),
            user_profile: None,
        }
    }
}

impl NewsQuery {
    /// Cache slot key: one full pipeline run is memoized per parameter set.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{:?}",
            self.limit, self.category, self.time_filter, self.sort_by
        )
    }

    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// Parse the caller's lookback vocabulary into a duration. Unrecognized
/// values return `None`; callers decide their own default.
pub fn lookback_window(time_filter: &str) -> Option<chrono::Duration> {
    match time_filter.trim().to_ascii_lowercase().as_str() {
        "1h" => Some(chrono::Duration::hours(1)),
        "24h" | "today" => Some(chrono::Duration::hours(24)),
        "7d" | "week" => Some(chrono::Duration::days(7)),
        "30d" | "month" => Some(chrono::Duration::days(30)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parses_aliases() {
        assert_eq!(SortKey::parse("date"), SortKey::Date);
        assert_eq!(SortKey::parse("TRENDING"), SortKey::Trending);
        assert_eq!(SortKey::parse("anything-else"), SortKey::Relevance);
    }

    #[test]
    fn lookback_covers_synonyms() {
        assert_eq!(lookback_window("today"), lookback_window("24h"));
        assert_eq!(lookback_window("week"), lookback_window("7d"));
        assert_eq!(lookback_window("month"), lookback_window("30d"));
        assert!(lookback_window("fortnight").is_none());
    }

    #[test]
    fn clamp_score_bounds() {
        let mut a = sample();
        a.relevance_score = 1.7;
        a.clamp_score();
        assert_eq!(a.relevance_score, 1.0);
        a.relevance_score = -0.2;
        a.clamp_score();
        assert_eq!(a.relevance_score, 0.0);
    }

    fn sample() -> Article {
        Article {
            id: "x".into(),
            title: "t".into(),
            url: "https://example.test".into(),
            source: "s".into(),
            source_id: None,
            published_at: Utc::now(),
            summary: String::new(),
            content: String::new(),
            excerpt: String::new(),
            categories: BTreeSet::new(),
            tags: Vec::new(),
            image_url: None,
            author: None,
            relevance_score: DEFAULT_RELEVANCE_SCORE,
            engagement: Engagement::default(),
            source_priority: 2,
            processing_timestamp: Utc::now(),
        }
    }
}
