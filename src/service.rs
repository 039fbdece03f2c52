// src/service.rs
//! Top-level orchestration: catalog → fan-out → pipeline → cache. The
//! service never fails a request; whatever goes wrong, the caller gets a
//! (possibly empty) article list.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::aggregator::{AggregateConfig, Aggregator};
use crate::article::{AggregationResult, Article, NewsQuery};
use crate::cache::{Clock, ResponseCache, SystemClock};
use crate::catalog::SourceCatalog;
use crate::dedup::{Deduplicator, TitleSimilarityDeduper};
use crate::enrich::{Enricher, KeywordEnricher, RelevanceScorer, TermOverlapScorer};
use crate::fetch::{DefaultFetcher, SourceFetcher};
use crate::health::{HealthMonitor, MetricsHealthMonitor};
use crate::notify::NotificationEvent;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
}

/// What `/news` returns. Mirrors the cached snapshot plus the cache
/// disposition of this particular read.
#[derive(Debug, Clone, Serialize)]
pub struct NewsResponse {
    pub articles: Vec<Article>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
    pub cache: CacheStatus,
}

pub struct NewsService {
    catalog: SourceCatalog,
    aggregator: Aggregator,
    pipeline: Pipeline,
    cache: ResponseCache,
    clock: Arc<dyn Clock>,
}

impl NewsService {
    /// Production wiring: default fetchers, metrics-backed health monitor,
    /// system clock, env-tuned timeouts and TTL.
    pub fn new(catalog: SourceCatalog, notify_tx: Option<UnboundedSender<NotificationEvent>>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_parts(
            catalog,
            Arc::new(DefaultFetcher::new()),
            Arc::new(MetricsHealthMonitor),
            Arc::new(TitleSimilarityDeduper),
            Arc::new(KeywordEnricher),
            Arc::new(TermOverlapScorer),
            AggregateConfig::from_env(),
            ResponseCache::from_env(Arc::clone(&clock)),
            clock,
            notify_tx,
        )
    }

    /// Fully injected constructor; what the integration tests use.
    #[allow(clippy::too_many_arguments)]
    pub fn with_parts(
        catalog: SourceCatalog,
        fetcher: Arc<dyn SourceFetcher>,
        health: Arc<dyn HealthMonitor>,
        dedup: Arc<dyn Deduplicator>,
        enricher: Arc<dyn Enricher>,
        scorer: Arc<dyn RelevanceScorer>,
        config: AggregateConfig,
        cache: ResponseCache,
        clock: Arc<dyn Clock>,
        notify_tx: Option<UnboundedSender<NotificationEvent>>,
    ) -> Self {
        Self {
            catalog,
            aggregator: Aggregator::new(fetcher, health, config),
            pipeline: Pipeline::new(dedup, enricher, scorer, notify_tx),
            cache,
            clock,
        }
    }

    /// Serve one request. A fresh cache entry short-circuits the whole
    /// fan-out; otherwise run the pipeline and memoize the snapshot.
    pub async fn get_news(&self, query: NewsQuery) -> NewsResponse {
        let key = query.cache_key();
        if let Some(snapshot) = self.cache.get(&key) {
            counter!("news_cache_hits_total").increment(1);
            return Self::respond(snapshot, CacheStatus::Hit);
        }
        counter!("news_cache_misses_total").increment(1);

        let snapshot = self.run_cycle(&query).await;
        self.cache.set(&key, snapshot.clone());
        Self::respond(snapshot, CacheStatus::Miss)
    }

    async fn run_cycle(&self, query: &NewsQuery) -> AggregationResult {
        let output = self
            .aggregator
            .aggregate(&self.catalog.sources, query)
            .await;
        let articles = self.pipeline.run(output.articles, query);
        AggregationResult {
            articles,
            fetched_at: self.clock.now(),
            sources_attempted: output.sources_attempted,
            sources_succeeded: output.sources_succeeded,
        }
    }

    fn respond(snapshot: AggregationResult, cache: CacheStatus) -> NewsResponse {
        NewsResponse {
            articles: snapshot.articles,
            fetched_at: snapshot.fetched_at,
            sources_attempted: snapshot.sources_attempted,
            sources_succeeded: snapshot.sources_succeeded,
            cache,
        }
    }
}
