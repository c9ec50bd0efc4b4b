use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{status_error, MLError, MLResult};

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for the sentence embedding service backing market memory.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: reqwest::Client,
    base_url: String,
}

impl EmbeddingClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url,
        }
    }

    pub async fn embed(&self, texts: &[String]) -> MLResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&format!("{}/embed", self.base_url))
            .json(&EmbedRequest { texts })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let result = response.json::<EmbedResponse>().await?;
        if result.embeddings.len() != texts.len() {
            return Err(MLError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }
        Ok(result.embeddings)
    }

    /// Check service health
    pub async fn health(&self) -> MLResult<bool> {
        let response = self
            .client
            .get(&format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let client = EmbeddingClient::new("http://127.0.0.1:9".to_string(), Duration::from_millis(300));
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let client = EmbeddingClient::new("http://127.0.0.1:9".to_string(), Duration::from_millis(300));
        let result = client.embed(&["BIAT".to_string()]).await;
        assert!(matches!(result, Err(MLError::RequestFailed(_))));
    }
}
