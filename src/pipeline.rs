// src/pipeline.rs
//! Post-fetch result pipeline: merge → dedupe → filter → sort → enrich →
//! re-rank → truncate. Pure apart from the fire-and-forget breaking-news
//! sends; every stage degrades instead of failing the request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;

use crate::article::{lookback_window, Article, NewsQuery, SortKey};
use crate::dedup::{Deduplicator, DEFAULT_SIMILARITY_THRESHOLD};
use crate::enrich::{Enricher, RelevanceScorer, BREAKING_CATEGORY};
use crate::notify::NotificationEvent;

/// Keyword table backing the category filter. "all" bypasses the filter;
/// an unlisted category falls back to matching its own name.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    map: HashMap<String, Vec<String>>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        let mut map = HashMap::new();
        let mut add = |cat: &str, words: &[&str]| {
            map.insert(
                cat.to_string(),
                words.iter().map(|w| w.to_string()).collect(),
            );
        };
        add("bitcoin", &["bitcoin", "btc", "satoshi", "lightning"]);
        add("ethereum", &["ethereum", "eth", "vitalik", "erc-20", "layer 2"]);
        add("defi", &["defi", "lending", "liquidity", "yield", "dex", "amm"]);
        add("nft", &["nft", "collectible", "opensea", "mint"]);
        add(
            "regulation",
            &["sec", "regulation", "regulatory", "lawsuit", "congress", "etf approval"],
        );
        add(
            "markets",
            &["price", "rally", "crash", "market", "trading", "bull", "bear"],
        );
        add("mining", &["mining", "miner", "hashrate", "halving"]);
        Self { map }
    }
}

impl CategoryRules {
    pub fn keywords_for(&self, category: &str) -> Vec<String> {
        let key = category.to_lowercase();
        self.map
            .get(&key)
            .cloned()
            .unwrap_or_else(|| vec![key])
    }
}

pub struct Pipeline {
    dedup: Arc<dyn Deduplicator>,
    enricher: Arc<dyn Enricher>,
    scorer: Arc<dyn RelevanceScorer>,
    rules: CategoryRules,
    similarity_threshold: f64,
    notify_tx: Option<UnboundedSender<NotificationEvent>>,
}

impl Pipeline {
    pub fn new(
        dedup: Arc<dyn Deduplicator>,
        enricher: Arc<dyn Enricher>,
        scorer: Arc<dyn RelevanceScorer>,
        notify_tx: Option<UnboundedSender<NotificationEvent>>,
    ) -> Self {
        Self {
            dedup,
            enricher,
            scorer,
            rules: CategoryRules::default(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            notify_tx,
        }
    }

    pub fn with_rules(mut self, rules: CategoryRules) -> Self {
        self.rules = rules;
        self
    }

    /// Run the full pipeline over one merged article list.
    pub fn run(&self, merged: Vec<Article>, query: &NewsQuery) -> Vec<Article> {
        let mut articles = self.dedup.dedupe(merged, self.similarity_threshold);

        articles = self.filter_by_category(articles, &query.category);
        articles = self.filter_by_recency(articles, &query.time_filter);

        sort_articles(&mut articles, query.sort_by);

        articles = self.enrich_and_score(articles, query);
        self.emit_breaking(&articles);

        // Once scoring has run, the final ordering is always
        // relevance-ranked.
        sort_articles(&mut articles, SortKey::Relevance);
        articles.truncate(query.clamped_limit());
        articles
    }

    fn filter_by_category(&self, articles: Vec<Article>, category: &str) -> Vec<Article> {
        if category.eq_ignore_ascii_case("all") {
            return articles;
        }
        let keywords = self.rules.keywords_for(category);
        articles
            .into_iter()
            .filter(|a| {
                let haystack = format!("{} {}", a.title, a.summary).to_lowercase();
                keywords.iter().any(|k| haystack.contains(k))
            })
            .collect()
    }

    /// Recency filtering must never manufacture an empty response when
    /// older matches exist: an emptying filter is skipped wholesale.
    fn filter_by_recency(&self, articles: Vec<Article>, time_filter: &str) -> Vec<Article> {
        let Some(window) = lookback_window(time_filter) else {
            return articles;
        };
        let cutoff = Utc::now() - window;
        let recent: Vec<Article> = articles
            .iter()
            .filter(|a| a.published_at >= cutoff)
            .cloned()
            .collect();
        if recent.is_empty() && !articles.is_empty() {
            tracing::debug!(
                target: "pipeline",
                time_filter,
                kept = articles.len(),
                "recency filter would empty the result, skipping it"
            );
            return articles;
        }
        recent
    }

    fn enrich_and_score(&self, articles: Vec<Article>, query: &NewsQuery) -> Vec<Article> {
        let fallback = articles.clone();
        match self.enricher.enrich(articles) {
            Ok(mut enriched) => {
                for article in &mut enriched {
                    article.relevance_score =
                        self.scorer.score(article, query.user_profile.as_ref());
                    article.clamp_score();
                }
                enriched
            }
            Err(err) => {
                // Degrade to the un-enriched input and whatever scores it
                // already carried.
                tracing::warn!(target: "pipeline", error = %format!("{err:#}"), "enrichment failed, serving unenriched articles");
                fallback
            }
        }
    }

    fn emit_breaking(&self, articles: &[Article]) {
        let Some(tx) = &self.notify_tx else {
            return;
        };
        for article in articles {
            if article.categories.contains(BREAKING_CATEGORY) {
                // Unbounded send: the response is never delayed by
                // notification delivery.
                let _ = tx.send(NotificationEvent::from_article(article));
            }
        }
    }
}

fn sort_articles(articles: &mut [Article], key: SortKey) {
    match key {
        SortKey::Relevance => articles.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortKey::Date => articles.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortKey::Engagement | SortKey::Trending => articles.sort_by_key(|a| {
            std::cmp::Reverse(a.engagement.likes + a.engagement.views)
        }),
    }
}
