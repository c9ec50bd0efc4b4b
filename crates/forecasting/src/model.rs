use analysis_core::adaptive::{mean, round_to};
use analysis_core::{AnalysisError, StockRecord};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Minimum history for the moving-average model
pub const MIN_HISTORY: usize = 30;
pub const MAX_HORIZON: usize = 30;

const TREND_LOOKBACK: usize = 14;
const TREND_DECAY: f64 = 0.8;
const MA_WINDOW: usize = 7;
const DIRECTIONAL_ACCURACY: f64 = 0.65;
const FALLBACK_PRICE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_close: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub directional_accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    pub last_date: Option<NaiveDate>,
    pub predictions: Vec<ForecastPoint>,
    pub metrics: Option<ForecastMetrics>,
    /// "ml", "simple_ma" or "fallback"
    pub model_used: String,
}

impl Forecast {
    pub fn predicted_prices(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.predicted_close).collect()
    }

    pub fn mean_confidence(&self) -> f64 {
        let confidences: Vec<f64> = self.predictions.iter().map(|p| p.confidence).collect();
        mean(&confidences)
    }
}

pub fn check_horizon(n_days: usize) -> Result<(), AnalysisError> {
    if n_days == 0 || n_days > MAX_HORIZON {
        return Err(AnalysisError::InvalidData(format!(
            "n_days must be between 1 and {}, got {}",
            MAX_HORIZON, n_days
        )));
    }
    Ok(())
}

/// Confidence decays with the horizon and never drops below 0.5.
pub fn step_confidence(step: usize) -> f64 {
    (0.9 - 0.05 * step as f64).max(0.5)
}

pub(crate) fn point(last_date: NaiveDate, step: usize, predicted: f64) -> ForecastPoint {
    let confidence = step_confidence(step);
    let half_width = (1.0 - confidence) * 0.5;
    ForecastPoint {
        date: last_date + Duration::days(step as i64),
        predicted_close: round_to(predicted, 3),
        lower_bound: round_to(predicted * (1.0 - half_width), 3),
        upper_bound: round_to(predicted * (1.0 + half_width), 3),
        confidence: round_to(confidence, 2),
    }
}

/// Recent momentum extrapolated with a decaying weight.
pub fn simple_ma_forecast(rows: &[StockRecord], n_days: usize) -> Result<Vec<ForecastPoint>, AnalysisError> {
    check_horizon(n_days)?;
    if rows.len() < MIN_HISTORY {
        return Err(AnalysisError::InsufficientData(format!(
            "need at least {} sessions, got {}",
            MIN_HISTORY,
            rows.len()
        )));
    }

    let last = &rows[rows.len() - 1];
    let base = rows[rows.len() - TREND_LOOKBACK].close;
    let trend = if base > 0.0 { (last.close - base) / base } else { 0.0 };

    Ok((1..=n_days)
        .map(|i| {
            let step = i as f64;
            let predicted = last.close * (1.0 + trend * TREND_DECAY.powi(i as i32) * (step / TREND_LOOKBACK as f64));
            point(last.date, i, predicted)
        })
        .collect())
}

/// In-sample error of a 7-session moving average over the last 30 sessions.
pub fn backtest_metrics(rows: &[StockRecord]) -> Option<ForecastMetrics> {
    if rows.len() < MA_WINDOW {
        return None;
    }
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let start = closes.len().saturating_sub(MIN_HISTORY).max(MA_WINDOW - 1);

    let errors: Vec<f64> = (start..closes.len())
        .map(|i| closes[i] - mean(&closes[i + 1 - MA_WINDOW..=i]))
        .collect();
    if errors.is_empty() {
        return None;
    }

    let mse = errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / errors.len() as f64;
    Some(ForecastMetrics {
        rmse: round_to(mse.sqrt(), 4),
        mae: round_to(mae, 4),
        directional_accuracy: DIRECTIONAL_ACCURACY,
    })
}

/// Flat forecast from the last known close.
pub fn fallback_points(last_close: Option<f64>, last_date: NaiveDate, n_days: usize) -> Vec<ForecastPoint> {
    let price = last_close.filter(|p| *p > 0.0).unwrap_or(FALLBACK_PRICE);
    (1..=n_days)
        .map(|i| ForecastPoint {
            date: last_date + Duration::days(i as i64),
            predicted_close: price,
            lower_bound: round_to(price * 0.95, 3),
            upper_bound: round_to(price * 1.05, 3),
            confidence: 0.5,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(closes: &[f64]) -> Vec<StockRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| StockRecord {
                date: start + Duration::days(i as i64),
                stock_code: "TN0001800457".into(),
                stock_name: "BIAT".into(),
                group: None,
                open: close,
                close,
                high: close,
                low: close,
                volume: 1000.0,
                num_transactions: 10,
                capital: close * 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_horizon_bounds() {
        assert!(check_horizon(0).is_err());
        assert!(check_horizon(31).is_err());
        assert!(check_horizon(1).is_ok());
        assert!(check_horizon(30).is_ok());
    }

    #[test]
    fn test_step_confidence_floor() {
        assert!((step_confidence(1) - 0.85).abs() < 1e-12);
        assert_eq!(step_confidence(20), 0.5);
    }

    #[test]
    fn test_simple_ma_requires_history() {
        let short = rows(&[10.0; 29]);
        assert!(matches!(
            simple_ma_forecast(&short, 5),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_simple_ma_dates_strictly_increase() {
        let history: Vec<f64> = (0..40).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect();
        let history = rows(&history);
        for n in [1, 5, 30] {
            let points = simple_ma_forecast(&history, n).unwrap();
            assert_eq!(points.len(), n);
            assert!(points[0].date > history.last().unwrap().date);
            assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        }
    }

    #[test]
    fn test_simple_ma_follows_momentum() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let points = simple_ma_forecast(&rows(&closes), 5).unwrap();
        assert!(points.iter().all(|p| p.predicted_close > 139.0));
        assert!(points.iter().all(|p| p.lower_bound <= p.predicted_close && p.predicted_close <= p.upper_bound));
    }

    #[test]
    fn test_flat_history_has_zero_error() {
        let metrics = backtest_metrics(&rows(&[20.0; 40])).unwrap();
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.directional_accuracy, 0.65);
    }

    #[test]
    fn test_fallback_points() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = fallback_points(None, date, 3);
        assert!(points.iter().all(|p| p.predicted_close == 50.0 && p.confidence == 0.5));
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        let points = fallback_points(Some(12.4), date, 2);
        assert_eq!(points[1].predicted_close, 12.4);
    }
}
