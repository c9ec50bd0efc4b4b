//! Semantic market memory: past news, anomalies and recommendations
//! retrieved from Qdrant as supporting evidence for a recommendation.

pub mod embedder;
pub mod error;
pub mod memory;
pub mod qdrant;

pub use embedder::{cosine_similarity, EmbeddingProvider, HashedEmbedder, RemoteEmbedder, EMBEDDING_DIM};
pub use error::{MemoryError, MemoryResult};
pub use memory::{MarketMemory, MemoryConfig, COLLECTIONS};
pub use qdrant::QdrantClient;
