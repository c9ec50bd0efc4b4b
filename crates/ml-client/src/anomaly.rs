use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{status_error, MLError, MLResult};

#[derive(Debug, Clone, Serialize)]
struct ScoreRequest<'a> {
    features: &'a [Vec<f64>],
}

/// Per-row output of the isolation-forest style service. A label of -1
/// marks an outlier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub labels: Vec<i32>,
    #[serde(default)]
    pub scores: Vec<f64>,
}

impl ScoreResponse {
    pub fn flags(&self) -> Vec<bool> {
        self.labels.iter().map(|l| *l == -1).collect()
    }
}

#[derive(Clone)]
pub struct AnomalyClient {
    client: reqwest::Client,
    base_url: String,
}

impl AnomalyClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url,
        }
    }

    /// Score engineered feature rows, returning one outlier flag per row.
    pub async fn score(&self, features: &[Vec<f64>]) -> MLResult<Vec<bool>> {
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&format!("{}/score", self.base_url))
            .json(&ScoreRequest { features })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let result = response.json::<ScoreResponse>().await?;
        if result.labels.len() != features.len() {
            return Err(MLError::InvalidResponse(format!(
                "expected {} labels, got {}",
                features.len(),
                result.labels.len()
            )));
        }
        Ok(result.flags())
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

    #[test]
    fn test_flags_from_labels() {
        let resp: ScoreResponse = serde_json::from_str(r#"{"labels":[1,-1,1]}"#).unwrap();
        assert_eq!(resp.flags(), vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_empty_features_skip_request() {
        let client = AnomalyClient::new("http://127.0.0.1:9".to_string(), Duration::from_millis(300));
        assert!(client.score(&[]).await.unwrap().is_empty());
    }
}
