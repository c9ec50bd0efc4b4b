pub mod anomaly;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod price_predictor;
pub mod sentiment;

pub use anomaly::AnomalyClient;
pub use embeddings::EmbeddingClient;
pub use error::{MLError, MLResult};
pub use llm::LlmSentimentClient;
pub use price_predictor::PricePredictorClient;
pub use sentiment::SentimentClient;

use std::time::Duration;

/// Configuration for ML services
#[derive(Debug, Clone)]
pub struct MLConfig {
    pub sentiment_url: String,
    pub price_predictor_url: String,
    pub anomaly_url: String,
    pub embeddings_url: String,
    pub llm_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub timeout: Duration,
}

impl Default for MLConfig {
    fn default() -> Self {
        let timeout_secs = std::env::var("ML_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        Self {
            sentiment_url: std::env::var("ML_SENTIMENT_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            price_predictor_url: std::env::var("ML_PRICE_PREDICTOR_URL")
                .unwrap_or_else(|_| "http://localhost:8003".to_string()),
            anomaly_url: std::env::var("ML_ANOMALY_URL")
                .unwrap_or_else(|_| "http://localhost:8005".to_string()),
            embeddings_url: std::env::var("ML_EMBEDDINGS_URL")
                .unwrap_or_else(|_| "http://localhost:8006".to_string()),
            llm_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            llm_api_key: std::env::var("LLM_API_KEY")
                .or_else(|_| std::env::var("GROQ_API_KEY"))
                .ok()
                .filter(|k| !k.is_empty()),
            llm_model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "llama3-8b-8192".to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Complete ML client with all services
#[derive(Clone)]
pub struct MLClient {
    pub sentiment: SentimentClient,
    pub llm: Option<LlmSentimentClient>,
    pub price_predictor: PricePredictorClient,
    pub anomaly: AnomalyClient,
    pub embeddings: EmbeddingClient,
}

impl MLClient {
    pub fn new(config: MLConfig) -> Self {
        let llm = config.llm_api_key.clone().map(|key| {
            LlmSentimentClient::new(config.llm_url.clone(), key, config.llm_model.clone(), config.timeout)
        });

        Self {
            sentiment: SentimentClient::new(config.sentiment_url.clone(), config.timeout),
            llm,
            price_predictor: PricePredictorClient::new(config.price_predictor_url.clone(), config.timeout),
            anomaly: AnomalyClient::new(config.anomaly_url.clone(), config.timeout),
            embeddings: EmbeddingClient::new(config.embeddings_url.clone(), config.timeout),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(MLConfig::default())
    }
}

/// Shared HTTP client builder for every service client.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            reqwest::Client::new()
        })
}
