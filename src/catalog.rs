// src/catalog.rs
//! Source catalog: the static list of feed/API descriptors the aggregator
//! fans out to. Loaded once at startup from TOML, with a compiled-in
//! default set when no file is configured.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_SOURCES_PATH: &str = "SOURCES_CONFIG_PATH";
pub const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    Get,
    Post,
}

impl Default for RequestMethod {
    fn default() -> Self {
        RequestMethod::Get
    }
}

/// One upstream source. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    pub category: String,
    /// 1–4, lower = higher priority.
    pub priority: u8,
    pub enabled: bool,
    pub kind: SourceKind,
    /// Env var holding the API key; a missing var quietly disables the
    /// source, it is not a failure.
    #[serde(default)]
    pub credential_env: Option<String>,
    #[serde(default)]
    pub method: RequestMethod,
}

impl SourceDescriptor {
    /// Whether this source can be attempted right now: enabled, and for API
    /// sources, its credential (when one is declared) is present.
    pub fn is_available(&self) -> bool {
        if !self.enabled {
            return false;
        }
        match &self.credential_env {
            Some(var) => std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false),
            None => true,
        }
    }

    pub fn credential(&self) -> Option<String> {
        self.credential_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCatalog {
    pub sources: Vec<SourceDescriptor>,
}

impl SourceCatalog {
    /// Load using env var + fallbacks:
    /// 1) $SOURCES_CONFIG_PATH
    /// 2) config/sources.toml
    /// 3) compiled-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
            let pb = PathBuf::from(p);
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_SOURCES_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        tracing::info!(target: "catalog", "no sources file found, using built-in catalog");
        Ok(Self::builtin())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading source catalog from {}", path.display()))?;
        let catalog: SourceCatalog =
            toml::from_str(&content).context("parsing source catalog toml")?;
        catalog.validate()?;
        tracing::info!(
            target: "catalog",
            sources = catalog.sources.len(),
            path = %path.display(),
            "loaded source catalog"
        );
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for s in &self.sources {
            anyhow::ensure!(
                (1..=4).contains(&s.priority),
                "source '{}': priority {} outside 1..=4",
                s.name,
                s.priority
            );
            anyhow::ensure!(!s.url.trim().is_empty(), "source '{}': empty url", s.name);
        }
        Ok(())
    }

    /// The compiled-in catalog: the usual crypto press feeds plus the three
    /// JSON API upstreams.
    pub fn builtin() -> Self {
        fn feed(name: &str, url: &str, category: &str, priority: u8) -> SourceDescriptor {
            SourceDescriptor {
                name: name.to_string(),
                url: url.to_string(),
                category: category.to_string(),
                priority,
                enabled: true,
                kind: SourceKind::Feed,
                credential_env: None,
                method: RequestMethod::Get,
            }
        }

        let mut sources = vec![
            feed("CoinDesk", "https://www.coindesk.com/arc/outboundfeeds/rss/", "markets", 1),
            feed("Cointelegraph", "https://cointelegraph.com/rss", "markets", 1),
            feed("Decrypt", "https://decrypt.co/feed", "general", 1),
            feed("The Block", "https://www.theblock.co/rss.xml", "markets", 1),
            feed("Bitcoin Magazine", "https://bitcoinmagazine.com/feed", "bitcoin", 2),
            feed("CryptoSlate", "https://cryptoslate.com/feed/", "general", 2),
            feed("NewsBTC", "https://www.newsbtc.com/feed/", "bitcoin", 2),
            feed("Bitcoinist", "https://bitcoinist.com/feed/", "bitcoin", 3),
            feed("AMBCrypto", "https://ambcrypto.com/feed/", "general", 3),
            feed("BeInCrypto", "https://beincrypto.com/feed/", "general", 3),
            feed("CryptoPotato", "https://cryptopotato.com/feed/", "general", 4),
            feed("U.Today", "https://u.today/rss", "general", 4),
        ];

        sources.push(SourceDescriptor {
            name: "cryptopanic".to_string(),
            url: "https://cryptopanic.com/api/v1/posts/".to_string(),
            category: "general".to_string(),
            priority: 1,
            enabled: true,
            kind: SourceKind::Api,
            credential_env: Some("CRYPTOPANIC_API_KEY".to_string()),
            method: RequestMethod::Post,
        });
        sources.push(SourceDescriptor {
            name: "newsdata".to_string(),
            url: "https://newsdata.io/api/1/news".to_string(),
            category: "general".to_string(),
            priority: 2,
            enabled: true,
            kind: SourceKind::Api,
            credential_env: Some("NEWSDATA_API_KEY".to_string()),
            method: RequestMethod::Get,
        });
        sources.push(SourceDescriptor {
            name: "blockbeat".to_string(),
            url: "https://api.blockbeat.io/v1/news".to_string(),
            category: "general".to_string(),
            priority: 3,
            enabled: true,
            kind: SourceKind::Api,
            credential_env: None,
            method: RequestMethod::Get,
        });

        Self { sources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_well_formed() {
        let catalog = SourceCatalog::builtin();
        assert!(catalog.sources.len() >= 10);
        catalog.validate().unwrap();
        assert!(catalog
            .sources
            .iter()
            .any(|s| s.kind == SourceKind::Api && s.method == RequestMethod::Post));
    }

    #[test]
    fn descriptor_without_credential_is_available_when_enabled() {
        let mut d = SourceCatalog::builtin().sources[0].clone();
        assert!(d.is_available());
        d.enabled = false;
        assert!(!d.is_available());
    }
}
