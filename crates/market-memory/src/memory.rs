use std::sync::Arc;
use std::time::Duration;

use analysis_core::{AnalysisError, MemoryEvidence, MemoryProvider};
use async_trait::async_trait;

use crate::embedder::{EmbeddingProvider, HashedEmbedder};
use crate::qdrant::QdrantClient;

pub const NEWS_COLLECTION: &str = "bvmt_news";
pub const ANOMALIES_COLLECTION: &str = "bvmt_anomalies";
pub const RECOMMENDATIONS_COLLECTION: &str = "bvmt_recommendations";
pub const COLLECTIONS: [&str; 3] = [NEWS_COLLECTION, ANOMALIES_COLLECTION, RECOMMENDATIONS_COLLECTION];

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub top_k: usize,
    pub score_threshold: f32,
    pub timeout: Duration,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            qdrant_url: std::env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok().filter(|k| !k.is_empty()),
            top_k: 3,
            score_threshold: 0.3,
            timeout: Duration::from_secs(5),
        }
    }
}

pub struct MarketMemory {
    qdrant: QdrantClient,
    embedder: Arc<dyn EmbeddingProvider>,
    config: MemoryConfig,
}

impl MarketMemory {
    pub fn new(config: MemoryConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let qdrant = QdrantClient::new(config.qdrant_url.clone(), config.qdrant_api_key.clone(), config.timeout);
        Self { qdrant, embedder, config }
    }

    /// Memory with local hashed embeddings only.
    pub fn offline_embeddings(config: MemoryConfig) -> Self {
        Self::new(config, Arc::new(HashedEmbedder))
    }

    /// Probe Qdrant; until this succeeds every lookup is skipped.
    pub async fn connect(&self) -> bool {
        self.qdrant.connect().await
    }

    pub fn is_available(&self) -> bool {
        self.qdrant.is_available()
    }

    pub fn embedding_method(&self) -> &'static str {
        self.embedder.method()
    }

    pub fn query_text(stock_code: &str, stock_name: &str) -> String {
        format!("{} {} analyse", stock_name, stock_code)
    }

    /// Past news, anomalies and recommendations about one stock.
    pub async fn retrieve(&self, stock_code: &str, stock_name: &str) -> Result<MemoryEvidence, AnalysisError> {
        if !self.is_available() {
            return Err(AnalysisError::ApiError("market memory unavailable".to_string()));
        }

        let query = vec![Self::query_text(stock_code, stock_name)];
        let vector = self
            .embedder
            .embed(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::CalculationError("empty query embedding".to_string()))?;

        let search = |collection: &'static str| {
            self.qdrant.search(
                collection,
                &vector,
                self.config.top_k,
                self.config.score_threshold,
                Some(stock_code),
            )
        };
        let (news, anomalies, recommendations) = tokio::join!(
            search(NEWS_COLLECTION),
            search(ANOMALIES_COLLECTION),
            search(RECOMMENDATIONS_COLLECTION),
        );

        Ok(MemoryEvidence {
            news,
            anomalies,
            recommendations,
        })
    }
}

#[async_trait]
impl MemoryProvider for MarketMemory {
    async fn evidence(&self, stock_code: &str, stock_name: &str) -> Result<MemoryEvidence, AnalysisError> {
        self.retrieve(stock_code, stock_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> MarketMemory {
        MarketMemory::offline_embeddings(MemoryConfig {
            qdrant_url: "http://127.0.0.1:9".to_string(),
            qdrant_api_key: None,
            top_k: 3,
            score_threshold: 0.3,
            timeout: Duration::from_millis(200),
        })
    }

    #[test]
    fn test_query_text() {
        assert_eq!(MarketMemory::query_text("TN0001800457", "BIAT"), "BIAT TN0001800457 analyse");
    }

    #[tokio::test]
    async fn test_offline_memory_reports_unavailable() {
        let memory = offline();
        assert!(!memory.connect().await);
        assert!(!memory.is_available());
        assert!(memory.evidence("TN0001800457", "BIAT").await.is_err());
        assert_eq!(memory.embedding_method(), "hashed");
    }
}
