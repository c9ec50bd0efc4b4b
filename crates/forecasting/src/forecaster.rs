use std::sync::Arc;

use analysis_core::adaptive::round_to;
use analysis_core::{AnalysisError, ForecastProvider, ForecastSignal};
use async_trait::async_trait;
use chrono::Utc;
use data_loader::StockStore;
use ml_client::PricePredictorClient;

use crate::model::{self, Forecast, ForecastPoint};
use crate::trend::{analyze_trend, TrendAnalysis};

/// Horizon used for the decision-engine signal
pub const SIGNAL_HORIZON: usize = 5;

pub struct Forecaster {
    store: Arc<StockStore>,
    predictor: Option<PricePredictorClient>,
}

impl Forecaster {
    pub fn new(store: Arc<StockStore>) -> Self {
        Self { store, predictor: None }
    }

    /// Try the remote price predictor first.
    pub fn with_predictor(mut self, predictor: PricePredictorClient) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Predict the next `n_days` closes. Dates always increase strictly from
    /// the last session.
    pub async fn predict_next_days(&self, stock_code: &str, n_days: usize) -> Result<Forecast, AnalysisError> {
        model::check_horizon(n_days)?;
        let rows = self.store.history(stock_code);
        let last = rows
            .last()
            .ok_or_else(|| AnalysisError::NotFound(format!("Stock {} not found", stock_code)))?;

        let metrics = model::backtest_metrics(rows);

        if let Some(points) = self.predict_remote(stock_code, n_days).await {
            return Ok(Forecast {
                stock_code: stock_code.to_string(),
                stock_name: self.store.get_stock_name(stock_code),
                current_price: last.close,
                last_date: Some(last.date),
                predictions: points,
                metrics,
                model_used: "ml".to_string(),
            });
        }

        let points = model::simple_ma_forecast(rows, n_days)?;
        Ok(Forecast {
            stock_code: stock_code.to_string(),
            stock_name: self.store.get_stock_name(stock_code),
            current_price: last.close,
            last_date: Some(last.date),
            predictions: points,
            metrics,
            model_used: "simple_ma".to_string(),
        })
    }

    async fn predict_remote(&self, stock_code: &str, n_days: usize) -> Option<Vec<ForecastPoint>> {
        let predictor = self.predictor.as_ref()?;
        let rows = self.store.history(stock_code);
        let last = rows.last()?;
        let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();

        match predictor.predict(stock_code, &closes, n_days).await {
            Ok(prediction) => Some(
                prediction
                    .predicted_prices
                    .iter()
                    .enumerate()
                    .map(|(i, price)| model::point(last.date, i + 1, *price))
                    .collect(),
            ),
            Err(e) => {
                tracing::debug!("Price predictor failed for {}, falling back to simple_ma: {}", stock_code, e);
                None
            }
        }
    }

    /// Flat forecast used when no model can run.
    pub fn fallback_forecast(&self, stock_code: &str, n_days: usize) -> Forecast {
        let rows = self.store.history(stock_code);
        let last = rows.last();
        let last_date = last.map(|r| r.date).unwrap_or_else(|| Utc::now().date_naive());
        let predictions = model::fallback_points(last.map(|r| r.close), last_date, n_days);

        Forecast {
            stock_code: stock_code.to_string(),
            stock_name: self.store.get_stock_name(stock_code),
            current_price: predictions.first().map_or(0.0, |p| p.predicted_close),
            last_date: last.map(|r| r.date),
            predictions,
            metrics: None,
            model_used: "fallback".to_string(),
        }
    }

    /// `predict_next_days`, degrading to the flat forecast when history is short.
    pub async fn forecast_or_fallback(&self, stock_code: &str, n_days: usize) -> Result<Forecast, AnalysisError> {
        match self.predict_next_days(stock_code, n_days).await {
            Err(AnalysisError::InsufficientData(reason)) => {
                tracing::warn!("Using fallback forecast for {}: {}", stock_code, reason);
                Ok(self.fallback_forecast(stock_code, n_days))
            }
            other => other,
        }
    }

    pub fn get_trend_analysis(&self, stock_code: &str) -> Result<TrendAnalysis, AnalysisError> {
        let closes: Vec<f64> = self.store.history(stock_code).iter().map(|r| r.close).collect();
        analyze_trend(stock_code, &closes)
            .ok_or_else(|| AnalysisError::NotFound(format!("Stock {} not found", stock_code)))
    }
}

/// Fractional move between the first and last predicted price.
pub fn forecast_trend(prices: &[f64]) -> f64 {
    match (prices.first(), prices.last()) {
        (Some(&first), Some(&last)) if prices.len() >= 2 && first > 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

#[async_trait]
impl ForecastProvider for Forecaster {
    async fn forecast(&self, stock_code: &str) -> Result<ForecastSignal, AnalysisError> {
        let forecast = self.predict_next_days(stock_code, SIGNAL_HORIZON).await?;
        let predictions = forecast.predicted_prices();

        Ok(ForecastSignal {
            trend: forecast_trend(&predictions),
            confidence: round_to(forecast.mean_confidence(), 2),
            predictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::StockRecord;
    use chrono::{Duration, NaiveDate};

    fn store(sessions: usize) -> Arc<StockStore> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let records = (0..sessions)
            .map(|i| {
                let close = 50.0 + i as f64 * 0.25;
                StockRecord {
                    date: start + Duration::days(i as i64),
                    stock_code: "TN0001600154".into(),
                    stock_name: "ATTIJARI BANK".into(),
                    group: Some("11".into()),
                    open: close,
                    close,
                    high: close,
                    low: close,
                    volume: 5000.0,
                    num_transactions: 40,
                    capital: close * 5000.0,
                }
            })
            .collect();
        Arc::new(StockStore::new(records))
    }

    #[tokio::test]
    async fn test_predict_dates_strictly_increasing() {
        let forecaster = Forecaster::new(store(60));
        let forecast = forecaster.predict_next_days("TN0001600154", 10).await.unwrap();
        assert_eq!(forecast.model_used, "simple_ma");
        assert_eq!(forecast.predictions.len(), 10);
        assert!(forecast.predictions[0].date > forecast.last_date.unwrap());
        assert!(forecast.predictions.windows(2).all(|w| w[0].date < w[1].date));
        assert!(forecast.metrics.is_some());
    }

    #[tokio::test]
    async fn test_unknown_stock_and_bad_horizon() {
        let forecaster = Forecaster::new(store(60));
        assert!(matches!(
            forecaster.predict_next_days("NOPE", 5).await,
            Err(AnalysisError::NotFound(_))
        ));
        assert!(matches!(
            forecaster.predict_next_days("TN0001600154", 0).await,
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_short_history_uses_fallback() {
        let forecaster = Forecaster::new(store(10));
        let forecast = forecaster.forecast_or_fallback("TN0001600154", 5).await.unwrap();
        assert_eq!(forecast.model_used, "fallback");
        assert_eq!(forecast.current_price, 52.25);
        assert!(forecast.predictions.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn test_unreachable_predictor_falls_back_to_simple_ma() {
        let predictor = PricePredictorClient::new(
            "http://127.0.0.1:9".to_string(),
            std::time::Duration::from_millis(200),
        );
        let forecaster = Forecaster::new(store(60)).with_predictor(predictor);
        let forecast = forecaster.predict_next_days("TN0001600154", 5).await.unwrap();
        assert_eq!(forecast.model_used, "simple_ma");
    }

    #[tokio::test]
    async fn test_forecast_signal_for_uptrend() {
        let forecaster = Forecaster::new(store(60));
        let signal = forecaster.forecast("TN0001600154").await.unwrap();
        assert_eq!(signal.predictions.len(), SIGNAL_HORIZON);
        assert!(signal.trend > 0.0);
        assert!(signal.confidence > 0.5 && signal.confidence < 0.9);
    }

    #[test]
    fn test_forecast_trend_edge_cases() {
        assert_eq!(forecast_trend(&[]), 0.0);
        assert_eq!(forecast_trend(&[10.0]), 0.0);
        assert_eq!(forecast_trend(&[0.0, 5.0]), 0.0);
        assert!((forecast_trend(&[10.0, 10.5, 11.0]) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_trend_analysis_lookup() {
        let forecaster = Forecaster::new(store(60));
        assert!(forecaster.get_trend_analysis("TN0001600154").is_ok());
        assert!(forecaster.get_trend_analysis("NOPE").is_err());
    }
}
