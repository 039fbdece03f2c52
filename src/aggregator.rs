// src/aggregator.rs
//! Concurrent source fan-out under a two-tier timeout budget.
//!
//! Every selected source is spawned as its own task, wrapped so it always
//! settles: failures and per-source timeouts become empty contributions,
//! never errors. The coordinator then drains outcomes until either all
//! tasks have settled or the global deadline fires, whichever comes first.
//! Stragglers keep running detached; they still report to the health
//! monitor, but their results are discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::article::{Article, FetchOutcome, NewsQuery};
use crate::catalog::SourceDescriptor;
use crate::fetch::SourceFetcher;
use crate::health::HealthMonitor;

pub const ENV_PER_SOURCE_TIMEOUT_SECS: &str = "NEWS_PER_SOURCE_TIMEOUT_SECS";
pub const ENV_GLOBAL_TIMEOUT_SECS: &str = "NEWS_GLOBAL_TIMEOUT_SECS";

#[derive(Debug, Clone, Copy)]
pub struct AggregateConfig {
    pub per_source_timeout: Duration,
    pub global_timeout: Duration,
    pub max_concurrent_sources: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            per_source_timeout: crate::fetch::PER_SOURCE_TIMEOUT,
            global_timeout: Duration::from_secs(20),
            max_concurrent_sources: 16,
        }
    }
}

impl AggregateConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(secs) = env_secs(ENV_PER_SOURCE_TIMEOUT_SECS) {
            cfg.per_source_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs(ENV_GLOBAL_TIMEOUT_SECS) {
            cfg.global_timeout = Duration::from_secs(secs);
        }
        cfg
    }
}

fn env_secs(var: &str) -> Option<u64> {
    std::env::var(var).ok().and_then(|v| v.trim().parse().ok())
}

/// Flattened result of one fan-out cycle.
#[derive(Debug)]
pub struct AggregateOutput {
    pub articles: Vec<Article>,
    pub sources_attempted: usize,
    pub sources_succeeded: usize,
}

pub struct Aggregator {
    fetcher: Arc<dyn SourceFetcher>,
    health: Arc<dyn HealthMonitor>,
    config: AggregateConfig,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        health: Arc<dyn HealthMonitor>,
        config: AggregateConfig,
    ) -> Self {
        Self {
            fetcher,
            health,
            config,
        }
    }

    /// Fan out to the available sources and return whatever has settled
    /// within the global budget. Never fails; an all-sources-down cycle
    /// returns an empty list.
    pub async fn aggregate(&self, sources: &[SourceDescriptor], query: &NewsQuery) -> AggregateOutput {
        let mut selected: Vec<SourceDescriptor> = sources
            .iter()
            .filter(|d| d.is_available())
            .cloned()
            .collect();
        // Lower number = higher priority; ties keep catalog order.
        selected.sort_by_key(|d| d.priority);
        selected.truncate(self.config.max_concurrent_sources);

        let attempted = selected.len();
        if attempted == 0 {
            tracing::warn!(target: "aggregate", "no sources available to fetch");
            return AggregateOutput {
                articles: Vec::new(),
                sources_attempted: 0,
                sources_succeeded: 0,
            };
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<FetchOutcome>();
        for descriptor in selected {
            let fetcher = Arc::clone(&self.fetcher);
            let health = Arc::clone(&self.health);
            let query = query.clone();
            let tx = tx.clone();
            let per_source = self.config.per_source_timeout;

            tokio::spawn(async move {
                let outcome = fetch_one(&*fetcher, &*health, &descriptor, &query, per_source).await;
                // Receiver may be gone if the global deadline already
                // fired; the outcome is discarded in that case.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.config.global_timeout;
        let mut outcomes: Vec<FetchOutcome> = Vec::with_capacity(attempted);
        while outcomes.len() < attempted {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        target: "aggregate",
                        settled = outcomes.len(),
                        attempted,
                        "global timeout reached, proceeding with settled sources"
                    );
                    break;
                }
            }
        }

        let sources_succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let articles: Vec<Article> = outcomes
            .into_iter()
            .filter_map(|o| match o {
                FetchOutcome::Success { articles, .. } => Some(articles),
                FetchOutcome::Failure { .. } => None,
            })
            .flatten()
            .filter(|a| !a.title.is_empty())
            .collect();

        tracing::info!(
            target: "aggregate",
            attempted,
            succeeded = sources_succeeded,
            articles = articles.len(),
            "fan-out cycle complete"
        );

        AggregateOutput {
            articles,
            sources_attempted: attempted,
            sources_succeeded,
        }
    }
}

/// Run one fetch so it always settles, reporting the outcome to the
/// health monitor whether or not the coordinator is still listening.
async fn fetch_one(
    fetcher: &dyn SourceFetcher,
    health: &dyn HealthMonitor,
    descriptor: &SourceDescriptor,
    query: &NewsQuery,
    per_source: Duration,
) -> FetchOutcome {
    let started = std::time::Instant::now();
    match tokio::time::timeout(per_source, fetcher.fetch(descriptor, query)).await {
        Ok(Ok(articles)) => {
            let elapsed = started.elapsed();
            health.record_success(&descriptor.name, elapsed.as_millis() as u64, articles.len());
            FetchOutcome::Success {
                source: descriptor.name.clone(),
                articles,
                elapsed,
            }
        }
        Ok(Err(err)) => {
            let elapsed = started.elapsed();
            let error = format!("{err:#}");
            health.record_failure(&descriptor.name, &error);
            FetchOutcome::Failure {
                source: descriptor.name.clone(),
                error,
                elapsed,
            }
        }
        Err(_) => {
            let elapsed = started.elapsed();
            let error = format!("timed out after {}ms", per_source.as_millis());
            health.record_failure(&descriptor.name, &error);
            FetchOutcome::Failure {
                source: descriptor.name.clone(),
                error,
                elapsed,
            }
        }
    }
}
