use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use analysis_core::EvidenceItem;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::{MemoryError, MemoryResult};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    score_threshold: f32,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    id: Value,
    score: f64,
    #[serde(default)]
    payload: Option<Value>,
}

/// Minimal Qdrant REST client. Searches never fail towards the caller:
/// while the server is unreachable they return no hits.
pub struct QdrantClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    available: AtomicBool,
}

impl QdrantClient {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build Qdrant HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            available: AtomicBool::new(false),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Probe the server and remember whether it answered.
    pub async fn connect(&self) -> bool {
        let ok = match self.health().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("Cannot connect to Qdrant at {}: {}", self.base_url, e);
                false
            }
        };
        if ok {
            tracing::info!("Connected to Qdrant at {}", self.base_url);
        }
        self.available.store(ok, Ordering::Relaxed);
        ok
    }

    /// Check service health
    pub async fn health(&self) -> MemoryResult<bool> {
        let response = self.request(reqwest::Method::GET, "/collections").send().await?;
        Ok(response.status().is_success())
    }

    pub async fn collections(&self) -> MemoryResult<Vec<String>> {
        let response = self.request(reqwest::Method::GET, "/collections").send().await?;
        if !response.status().is_success() {
            return Err(MemoryError::Unavailable(format!("Status: {}", response.status())));
        }
        let body: Value = response.json().await?;
        Ok(body["result"]["collections"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|c| c["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn try_search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
        ticker: Option<&str>,
    ) -> MemoryResult<Vec<EvidenceItem>> {
        let request = SearchRequest {
            vector,
            limit: top_k,
            score_threshold,
            with_payload: true,
            filter: ticker.map(|t| json!({"must": [{"key": "ticker", "match": {"value": t}}]})),
        };

        let response = self
            .request(reqwest::Method::POST, &format!("/collections/{}/points/search", collection))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MemoryError::Unavailable(format!("Status: {}", response.status())));
        }

        let body = response.json::<SearchResponse>().await?;
        Ok(body.result.into_iter().map(to_evidence).collect())
    }

    /// Nearest points of `collection`, optionally restricted to one ticker.
    pub async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
        ticker: Option<&str>,
    ) -> Vec<EvidenceItem> {
        if !self.is_available() {
            return Vec::new();
        }
        match self.try_search(collection, vector, top_k, score_threshold, ticker).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Qdrant search on {} failed: {}", collection, e);
                Vec::new()
            }
        }
    }
}

fn payload_str(payload: &Value, key: &str) -> String {
    payload[key].as_str().unwrap_or_default().to_string()
}

fn to_evidence(point: ScoredPoint) -> EvidenceItem {
    let payload = point.payload.unwrap_or(Value::Null);
    let text = payload_str(&payload, "text");
    let id = match &point.id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => hex::encode(&Sha256::digest(text.as_bytes())[..8]),
    };

    EvidenceItem {
        id,
        score: point.score,
        ticker: payload_str(&payload, "ticker"),
        date: payload_str(&payload, "date"),
        kind: payload_str(&payload, "type"),
        source: payload_str(&payload, "source"),
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "result": [
                {"id": 42, "score": 0.81, "payload": {"text": "BIAT: hausse du PNB", "ticker": "TN0001800457", "date": "2024-02-01", "type": "news", "source": "Ilboursa"}},
                {"id": "5c56c793-69f3-4fbf-87e6-c4bf54c28c26", "score": 0.42, "payload": {"text": "Volume spike"}}
            ],
            "status": "ok",
            "time": 0.001
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        let items: Vec<EvidenceItem> = parsed.result.into_iter().map(to_evidence).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "42");
        assert_eq!(items[0].kind, "news");
        assert_eq!(items[1].id, "5c56c793-69f3-4fbf-87e6-c4bf54c28c26");
        assert_eq!(items[1].ticker, "");
    }

    #[test]
    fn test_missing_id_uses_text_digest() {
        let point = ScoredPoint {
            id: Value::Null,
            score: 0.5,
            payload: Some(json!({"text": "abc"})),
        };
        let item = to_evidence(point);
        assert_eq!(item.id.len(), 16);
    }

    #[test]
    fn test_search_request_filter_shape() {
        let vector = [0.1f32, 0.2];
        let request = SearchRequest {
            vector: &vector,
            limit: 3,
            score_threshold: 0.3,
            with_payload: true,
            filter: Some(json!({"must": [{"key": "ticker", "match": {"value": "TN0001600154"}}]})),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["limit"], 3);
        assert_eq!(value["filter"]["must"][0]["match"]["value"], "TN0001600154");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let client = QdrantClient::new("http://127.0.0.1:9".to_string(), None, Duration::from_millis(200));
        assert!(!client.connect().await);
        assert!(client.search("bvmt_news", &[0.0; 4], 3, 0.3, None).await.is_empty());
    }
}
