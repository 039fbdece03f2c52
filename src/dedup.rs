// src/dedup.rs
//! Near-duplicate collapse across sources.
//!
//! The pipeline only depends on the `Deduplicator` contract; the default
//! implementation compares lowercased titles with normalized Levenshtein
//! similarity and collapses exact URL matches.

use strsim::normalized_levenshtein;

use crate::article::Article;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Pure and deterministic: same input, same output, at least one
/// representative kept per duplicate cluster.
pub trait Deduplicator: Send + Sync {
    fn dedupe(&self, articles: Vec<Article>, threshold: f64) -> Vec<Article>;
}

#[derive(Debug, Default)]
pub struct TitleSimilarityDeduper;

impl TitleSimilarityDeduper {
    fn is_duplicate(kept: &Article, candidate: &Article, threshold: f64) -> bool {
        if normalize_url(&kept.url) == normalize_url(&candidate.url) {
            return true;
        }
        let a = kept.title.to_lowercase();
        let b = candidate.title.to_lowercase();
        normalized_levenshtein(&a, &b) >= threshold
    }
}

impl Deduplicator for TitleSimilarityDeduper {
    fn dedupe(&self, articles: Vec<Article>, threshold: f64) -> Vec<Article> {
        let mut kept: Vec<Article> = Vec::with_capacity(articles.len());
        let mut dropped = 0usize;

        for candidate in articles {
            if kept
                .iter()
                .any(|k| Self::is_duplicate(k, &candidate, threshold))
            {
                dropped += 1;
                continue;
            }
            kept.push(candidate);
        }

        if dropped > 0 {
            tracing::debug!(target: "pipeline", dropped, kept = kept.len(), "collapsed near-duplicates");
        }
        kept
    }
}

fn normalize_url(url: &str) -> &str {
    url.trim_end_matches('/')
}
