// src/notify/mod.rs
//! Breaking-news notification fan-out. The pipeline drops events on an
//! unbounded channel and moves on; a detached dispatcher task delivers
//! them through every configured notifier.

pub mod webhook;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::article::Article;

pub use webhook::WebhookNotifier;

#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn from_article(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            url: article.url.clone(),
            source: article.source.clone(),
            published_at: article.published_at,
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// All configured notifiers behind one fan-out.
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Build from the environment; notifiers with no configuration stay
    /// silently disabled.
    pub fn from_env() -> Self {
        Self::new(vec![Box::new(WebhookNotifier::from_env())])
    }

    pub async fn dispatch(&self, event: &NotificationEvent) {
        for notifier in &self.notifiers {
            if let Err(err) = notifier.send(event).await {
                tracing::warn!(
                    target: "notify",
                    notifier = notifier.name(),
                    error = %format!("{err:#}"),
                    "notification delivery failed"
                );
            }
        }
    }
}

/// Spawn the dispatcher loop. The returned sender is what the pipeline
/// holds; dropping every sender ends the task.
pub fn spawn_dispatcher(mux: NotifierMux) -> (UnboundedSender<NotificationEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<NotificationEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(
                target: "notify",
                title = %event.title,
                source = %event.source,
                "dispatching breaking-news notification"
            );
            mux.dispatch(&event).await;
        }
    });
    (tx, handle)
}
