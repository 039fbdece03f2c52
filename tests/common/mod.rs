// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crypto_news_aggregator::article::{
    Article, Engagement, NewsQuery, DEFAULT_RELEVANCE_SCORE,
};
use crypto_news_aggregator::catalog::{RequestMethod, SourceDescriptor, SourceKind};
use crypto_news_aggregator::fetch::SourceFetcher;
use crypto_news_aggregator::health::HealthMonitor;

pub fn feed_descriptor(name: &str, priority: u8, enabled: bool) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url: format!("https://example.test/{}/feed", name.to_lowercase()),
        category: "general".to_string(),
        priority,
        enabled,
        kind: SourceKind::Feed,
        credential_env: None,
        method: RequestMethod::Get,
    }
}

pub fn article_published_at(
    title: &str,
    url: &str,
    source: &str,
    published_at: DateTime<Utc>,
) -> Article {
    Article {
        id: format!("{}-{}", source.to_lowercase(), url),
        title: title.to_string(),
        url: url.to_string(),
        source: source.to_string(),
        source_id: None,
        published_at,
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

pub fn article(title: &str, url: &str, source: &str) -> Article {
    article_published_at(title, url, source, Utc::now())
}

/// Per-source script: optional delay, then either articles or a failure.
pub struct Script {
    pub delay: Duration,
    pub articles: Option<Vec<Article>>,
}

impl Script {
    pub fn ok(articles: Vec<Article>) -> Self {
        Self {
            delay: Duration::ZERO,
            articles: Some(articles),
        }
    }

    pub fn ok_after(delay: Duration, articles: Vec<Article>) -> Self {
        Self {
            delay,
            articles: Some(articles),
        }
    }

    pub fn fail() -> Self {
        Self {
            delay: Duration::ZERO,
            articles: None,
        }
    }
}

/// Fetcher with a canned answer per source name, recording every call.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub scripts: HashMap<String, Script>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(scripts: Vec<(&str, Script)>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(name, s)| (name.to_string(), s))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
        _query: &NewsQuery,
    ) -> Result<Vec<Article>> {
        self.calls.lock().unwrap().push(descriptor.name.clone());
        let (delay, articles) = {
            let script = self
                .scripts
                .get(&descriptor.name)
                .unwrap_or_else(|| panic!("no script for source {}", descriptor.name));
            (script.delay, script.articles.clone())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        articles.ok_or_else(|| anyhow!("scripted failure for {}", descriptor.name))
    }
}

/// Health monitor capturing every report for assertions.
#[derive(Default)]
pub struct RecordingHealth {
    pub successes: Mutex<Vec<(String, usize)>>,
    pub failures: Mutex<Vec<(String, String)>>,
}

impl RecordingHealth {
    pub fn success_count(&self) -> usize {
        self.successes.lock().unwrap().len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().unwrap().len()
    }

    pub fn failed_sources(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl HealthMonitor for RecordingHealth {
    fn record_success(&self, source: &str, _latency_ms: u64, count: usize) {
        self.successes
            .lock()
            .unwrap()
            .push((source.to_string(), count));
    }

    fn record_failure(&self, source: &str, error: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((source.to_string(), error.to_string()));
    }
}

pub fn recording_health() -> Arc<RecordingHealth> {
    Arc::new(RecordingHealth::default())
}
