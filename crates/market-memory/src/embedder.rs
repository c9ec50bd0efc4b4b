use async_trait::async_trait;
use ml_client::EmbeddingClient;
use sha2::{Digest, Sha256};

use crate::error::{MemoryError, MemoryResult};

/// Vector size of the collections (multilingual MiniLM)
pub const EMBEDDING_DIM: usize = 384;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> MemoryResult<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    /// Short name reported alongside results
    fn method(&self) -> &'static str;
}

/// Deterministic local embedding: hashed tokens plus character bigrams,
/// L2-normalised.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedEmbedder;

impl HashedEmbedder {
    fn token_slot(token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut idx_bytes = [0u8; 8];
        idx_bytes.copy_from_slice(&digest[..8]);
        let slot = (u64::from_le_bytes(idx_bytes) % EMBEDDING_DIM as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (slot, sign)
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; EMBEDDING_DIM];
        let lowered = text.to_lowercase();

        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let (slot, sign) = Self::token_slot(word);
            embedding[slot] += sign;

            let bytes = word.as_bytes();
            for pair in bytes.windows(2) {
                let idx = ((pair[0] as usize * 256 + pair[1] as usize) * 13) % EMBEDDING_DIM;
                embedding[idx] += 0.5;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, texts: &[String]) -> MemoryResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn method(&self) -> &'static str {
        "hashed"
    }
}

/// Embeddings from the ML service, degrading to [`HashedEmbedder`].
pub struct RemoteEmbedder {
    client: EmbeddingClient,
    fallback: HashedEmbedder,
}

impl RemoteEmbedder {
    pub fn new(client: EmbeddingClient) -> Self {
        Self {
            client,
            fallback: HashedEmbedder,
        }
    }

    async fn embed_remote(&self, texts: &[String]) -> MemoryResult<Vec<Vec<f32>>> {
        let vectors = self
            .client
            .embed(texts)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != EMBEDDING_DIM) {
            return Err(MemoryError::Embedding(format!(
                "expected dimension {}, got {}",
                EMBEDDING_DIM,
                bad.len()
            )));
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, texts: &[String]) -> MemoryResult<Vec<Vec<f32>>> {
        match self.embed_remote(texts).await {
            Ok(vectors) => Ok(vectors),
            Err(e) => {
                tracing::debug!("Embedding service failed, falling back to hashed embeddings: {}", e);
                self.fallback.embed(texts).await
            }
        }
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn method(&self) -> &'static str {
        "remote"
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_embedding_is_normalized_and_deterministic() {
        let embedder = HashedEmbedder;
        let a = embedder.embed_one("BIAT TN0001800457 analyse");
        let b = embedder.embed_one("BIAT TN0001800457 analyse");
        assert_eq!(a.len(), EMBEDDING_DIM);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similar_texts_score_higher() {
        let embedder = HashedEmbedder;
        let query = embedder.embed_one("SFBT hausse des ventes de boissons");
        let close = embedder.embed_one("Hausse des ventes pour la SFBT");
        let far = embedder.embed_one("Krach obligataire au Japon");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashedEmbedder.embed_one("  ");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }

    #[tokio::test]
    async fn test_remote_embedder_falls_back() {
        let client = EmbeddingClient::new("http://127.0.0.1:9".to_string(), std::time::Duration::from_millis(200));
        let embedder = RemoteEmbedder::new(client);
        let texts = vec!["Attijari bank".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors, vec![HashedEmbedder.embed_one("Attijari bank")]);
    }
}
