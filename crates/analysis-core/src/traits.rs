use async_trait::async_trait;
use crate::{AnalysisError, AnomalySignal, ForecastSignal, MemoryEvidence, SentimentSignal};

/// Source of the 5-day forecast signal
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecast(&self, stock_code: &str) -> Result<ForecastSignal, AnalysisError>;
}

/// Source of the news sentiment signal
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn sentiment(&self, stock_code: &str) -> Result<SentimentSignal, AnalysisError>;
}

/// Source of the anomaly signal
#[async_trait]
pub trait AnomalyProvider: Send + Sync {
    async fn anomalies(&self, stock_code: &str) -> Result<AnomalySignal, AnalysisError>;
}

/// Semantic evidence lookup (optional)
#[async_trait]
pub trait MemoryProvider: Send + Sync {
    async fn evidence(&self, stock_code: &str, stock_name: &str) -> Result<MemoryEvidence, AnalysisError>;
}

/// Read access to prices and the stock universe
pub trait MarketData: Send + Sync {
    fn stock_name(&self, stock_code: &str) -> String;

    fn current_price(&self, stock_code: &str) -> Result<f64, AnalysisError>;

    fn all_stock_codes(&self) -> Vec<String>;

    /// Closing prices, oldest first
    fn closes(&self, stock_code: &str) -> Vec<f64>;

    fn liquid_stock_codes(&self, min_avg_volume: f64, min_days: usize) -> Vec<String>;

    /// Std of daily returns over the last `days` closes
    fn volatility(&self, stock_code: &str, days: usize) -> Option<f64> {
        let closes = self.closes(stock_code);
        let start = closes.len().saturating_sub(days);
        let returns = crate::adaptive::pct_change(&closes[start..]);
        if returns.is_empty() {
            return None;
        }
        Some(crate::adaptive::population_std(&returns))
    }
}
