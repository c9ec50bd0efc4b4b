use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{status_error, MLError, MLResult};

/// Price path returned by the forecasting service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePrediction {
    pub predicted_prices: Vec<f64>,
    #[serde(default)]
    pub lower_bound: Option<Vec<f64>>,
    #[serde(default)]
    pub upper_bound: Option<Vec<f64>>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct PredictionRequest<'a> {
    stock_code: &'a str,
    closes: &'a [f64],
    horizon: usize,
}

#[derive(Clone)]
pub struct PricePredictorClient {
    client: reqwest::Client,
    base_url: String,
}

impl PricePredictorClient {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            base_url,
        }
    }

    /// Predict the next `horizon` closing prices from the close history.
    pub async fn predict(
        &self,
        stock_code: &str,
        closes: &[f64],
        horizon: usize,
    ) -> MLResult<PricePrediction> {
        let request = PredictionRequest {
            stock_code,
            closes,
            horizon,
        };

        let response = self
            .client
            .post(&format!("{}/predict", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response.status()));
        }

        let result = response.json::<PricePrediction>().await?;
        validate_prediction(&result, horizon)?;
        Ok(result)
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

fn validate_prediction(prediction: &PricePrediction, horizon: usize) -> MLResult<()> {
    if prediction.predicted_prices.len() != horizon {
        return Err(MLError::InvalidResponse(format!(
            "expected {} predicted prices, got {}",
            horizon,
            prediction.predicted_prices.len()
        )));
    }
    if prediction.predicted_prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(MLError::InvalidResponse("non-finite or negative price".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(prices: Vec<f64>) -> PricePrediction {
        PricePrediction {
            predicted_prices: prices,
            lower_bound: None,
            upper_bound: None,
            model: None,
        }
    }

    #[test]
    fn test_validate_horizon_mismatch() {
        assert!(validate_prediction(&prediction(vec![1.0, 2.0]), 5).is_err());
        assert!(validate_prediction(&prediction(vec![1.0, 2.0]), 2).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(validate_prediction(&prediction(vec![1.0, f64::NAN]), 2).is_err());
        assert!(validate_prediction(&prediction(vec![1.0, -0.5]), 2).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let client = PricePredictorClient::new("http://127.0.0.1:9".to_string(), Duration::from_millis(300));
        assert!(client.predict("TN0001800457", &[90.0, 91.0], 5).await.is_err());
    }
}
