// src/enrich.rs
//! Enrichment and relevance scoring seams.
//!
//! The pipeline treats both as external collaborators: `Enricher` may
//! rewrite or drop articles (never grow the list), `RelevanceScorer` maps
//! one article to a score in [0, 1]. The default implementations here are
//! keyword-driven and deterministic.

use anyhow::Result;
use chrono::Utc;

use crate::article::{Article, UserProfile};
use crate::text;

/// Fixed allow-list used both by the broad-keyword API gate and the default
/// scorer. Case-insensitive substring semantics.
pub const CRYPTO_TERMS: &[&str] = &[
    "bitcoin",
    "btc",
    "ethereum",
    "eth",
    "crypto",
    "cryptocurrency",
    "blockchain",
    "defi",
    "nft",
    "altcoin",
    "stablecoin",
    "solana",
    "web3",
    "token",
    "binance",
    "coinbase",
    "mining",
    "wallet",
    "staking",
    "exchange",
];

/// True when any allow-listed term appears in title, summary, or content.
pub fn matches_crypto_terms(article: &Article) -> bool {
    let haystack = format!(
        "{} {} {}",
        article.title, article.summary, article.content
    )
    .to_lowercase();
    CRYPTO_TERMS.iter().any(|term| haystack.contains(term))
}

/// Category an article is tagged with when enrichment classifies it as
/// breaking news; the pipeline watches for it on the notification path.
pub const BREAKING_CATEGORY: &str = "breaking";

const BREAKING_MARKERS: &[&str] = &["breaking", "just in", "urgent", "alert:"];

pub trait Enricher: Send + Sync {
    /// Returns the same or fewer items. Errors are caught by the pipeline,
    /// which then degrades to the un-enriched input.
    fn enrich(&self, articles: Vec<Article>) -> Result<Vec<Article>>;
}

pub trait RelevanceScorer: Send + Sync {
    /// Score in [0, 1]; the pipeline clamps defensively either way.
    fn score(&self, article: &Article, profile: Option<&UserProfile>) -> f64;
}

/// Default enricher: fills missing excerpts and tags, flags breaking news
/// via headline markers.
#[derive(Debug, Default)]
pub struct KeywordEnricher;

impl Enricher for KeywordEnricher {
    fn enrich(&self, mut articles: Vec<Article>) -> Result<Vec<Article>> {
        for article in &mut articles {
            if article.excerpt.is_empty() {
                let body = if article.summary.is_empty() {
                    &article.content
                } else {
                    &article.summary
                };
                article.excerpt = body.chars().take(200).collect();
            }
            if article.tags.is_empty() {
                article.tags = text::extract_tags(&article.title, &article.summary);
            }

            let headline = article.title.to_lowercase();
            if BREAKING_MARKERS.iter().any(|m| headline.contains(m)) {
                article.categories.insert(BREAKING_CATEGORY.to_string());
            }
        }
        Ok(articles)
    }
}

/// Default scorer: term overlap with the crypto vocabulary and the user's
/// interests, a freshness bonus, and a small engagement signal.
#[derive(Debug, Default)]
pub struct TermOverlapScorer;

impl RelevanceScorer for TermOverlapScorer {
    fn score(&self, article: &Article, profile: Option<&UserProfile>) -> f64 {
        let mut score: f64 = 0.4;
        let haystack = format!("{} {}", article.title, article.summary).to_lowercase();

        let term_hits = CRYPTO_TERMS
            .iter()
            .filter(|t| haystack.contains(*t))
            .count();
        score += 0.05 * term_hits.min(4) as f64;

        if let Some(profile) = profile {
            let interest_hits = profile
                .interests
                .iter()
                .filter(|i| !i.is_empty() && haystack.contains(&i.to_lowercase()))
                .count();
            score += 0.1 * interest_hits.min(3) as f64;
        }

        let age = Utc::now().signed_duration_since(article.published_at);
        if age < chrono::Duration::hours(24) {
            score += 0.1;
        }

        let buzz = article.engagement.likes + article.engagement.views;
        if buzz > 0 {
            score += (1.0 + buzz as f64).log10().min(3.0) * 0.02;
        }

        score.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{Engagement, DEFAULT_RELEVANCE_SCORE};
    use std::collections::BTreeSet;

    fn article(title: &str, summary: &str) -> Article {
        Article {
            id: "t".into(),
            title: title.to_string(),
            url: "https://example.test/a".into(),
            source: "Test".into(),
            source_id: None,
            published_at: Utc::now(),
            summary: summary.to_string(),
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

    #[test]
    fn breaking_marker_adds_category() {
        let out = KeywordEnricher
            .enrich(vec![article("BREAKING: exchange halts withdrawals", "")])
            .unwrap();
        assert!(out[0].categories.contains(BREAKING_CATEGORY));
    }

    #[test]
    fn excerpt_backfilled_from_summary() {
        let out = KeywordEnricher
            .enrich(vec![article("Title", "A short summary")])
            .unwrap();
        assert_eq!(out[0].excerpt, "A short summary");
    }

    #[test]
    fn crypto_article_outranks_off_topic() {
        let scorer = TermOverlapScorer;
        let on = scorer.score(&article("Bitcoin and ethereum rally", "crypto markets"), None);
        let off = scorer.score(&article("Local sports roundup", "weekend scores"), None);
        assert!(on > off);
    }

    #[test]
    fn interests_raise_the_score() {
        let scorer = TermOverlapScorer;
        let a = article("Solana validator update", "network performance");
        let base = scorer.score(&a, None);
        let profile = UserProfile {
            interests: vec!["solana".to_string()],
        };
        assert!(scorer.score(&a, Some(&profile)) > base);
    }

    #[test]
    fn gate_matches_on_content_too() {
        let mut a = article("Weekly digest", "various stories");
        assert!(!matches_crypto_terms(&a));
        a.content = "a deep dive into DeFi lending".to_string();
        assert!(matches_crypto_terms(&a));
    }
}
