use std::collections::BTreeMap;
use std::path::Path;

use analysis_core::AnalysisError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub headline: String,
    #[serde(default = "unknown_source")]
    pub source: String,
    /// ISO date string, compared lexically for recency
    #[serde(default)]
    pub date: String,
}

fn unknown_source() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockNews {
    #[serde(default)]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub articles: Vec<Article>,
}

/// Pre-collected news, keyed by stock code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewsCache {
    stocks: BTreeMap<String, StockNews>,
}

impl NewsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `news_cache.json`. A missing file gives an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!("News cache {} not found, using empty cache", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let cache: NewsCache = serde_json::from_str(&content)?;
        tracing::info!("Loaded news for {} stocks from {}", cache.len(), path.display());
        Ok(cache)
    }

    pub fn insert(&mut self, stock_code: impl Into<String>, news: StockNews) {
        self.stocks.insert(stock_code.into(), news);
    }

    pub fn get(&self, stock_code: &str) -> Option<&StockNews> {
        self.stocks.get(stock_code)
    }

    pub fn stock_codes(&self) -> Vec<String> {
        self.stocks.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}
