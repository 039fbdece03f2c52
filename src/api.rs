// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::article::{NewsQuery, SortKey, UserProfile, DEFAULT_LIMIT};
use crate::service::{NewsResponse, NewsService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NewsService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_time")]
    time: String,
    #[serde(default)]
    sort: Option<String>,
    /// Comma-separated interest list feeding the relevance scorer.
    #[serde(default)]
    interests: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_category() -> String {
    "all".to_string()
}

fn default_time() -> String {
    "24h".to_string()
}

impl NewsParams {
    fn into_query(self) -> NewsQuery {
        let user_profile = self.interests.as_deref().and_then(|raw| {
            let interests: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if interests.is_empty() {
                None
            } else {
                Some(UserProfile { interests })
            }
        });

        NewsQuery {
            limit: self.limit,
            category: self.category,
            time_filter: self.time,
            sort_by: self
                .sort
                .as_deref()
                .map(SortKey::parse)
                .unwrap_or_default(),
            user_profile,
        }
    }
}

/// The one caller-facing endpoint. Never fails: a cycle where every
/// source is down still answers 200 with an empty list.
async fn news(State(state): State<AppState>, Query(params): Query<NewsParams>) -> Json<NewsResponse> {
    let query = params.into_query();
    Json(state.service.get_news(query).await)
}
