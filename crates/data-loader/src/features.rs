use analysis_core::adaptive::{finite_or_zero, pct_change_aligned, rolling_mean, rolling_std};
use analysis_core::StockRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Per-session features for anomaly detection. Undefined values are 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    pub num_transactions: f64,
    pub price_change_pct: f64,
    pub volume_change_pct: f64,
    pub volatility_7d: f64,
    pub volume_ma_7d: f64,
    pub volume_ma_30d: f64,
    pub volume_ratio_7d: f64,
    pub volume_ratio_30d: f64,
    pub transaction_per_volume: f64,
    pub avg_transaction_size: f64,
    pub price_volume_corr: f64,
    pub high_low_spread_pct: f64,
}

impl FeatureRow {
    /// Feature vector in the column order expected by the external scorer.
    pub fn as_vector(&self) -> Vec<f64> {
        vec![
            self.volume,
            self.num_transactions,
            self.price_change_pct,
            self.volume_change_pct,
            self.volatility_7d,
            self.volume_ratio_7d,
            self.volume_ratio_30d,
            self.transaction_per_volume,
            self.avg_transaction_size,
            self.price_volume_corr,
            self.high_low_spread_pct,
        ]
    }
}

/// Rolling Pearson correlation over pairs where both sides are defined.
fn rolling_pair_corr(x: &[Option<f64>], y: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    let n = x.len().min(y.len());
    (0..n)
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (xs, ys): (Vec<f64>, Vec<f64>) = (start..=i)
                .filter_map(|j| Some((x[j]?, y[j]?)))
                .unzip();
            if xs.len() < min_periods {
                None
            } else {
                analysis_core::adaptive::pearson(&xs, &ys)
            }
        })
        .collect()
}

/// Engineer features for one stock's history (sorted oldest first).
pub fn engineer_features(rows: &[StockRecord]) -> Vec<FeatureRow> {
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<f64> = rows.iter().map(|r| r.volume).collect();
    let volume_opts: Vec<Option<f64>> = volumes.iter().copied().map(Some).collect();

    let price_change = pct_change_aligned(&closes);
    let volume_change = pct_change_aligned(&volumes);
    let volatility = rolling_std(&price_change, 7, 3);
    let volume_ma_7 = rolling_mean(&volume_opts, 7, 3);
    let volume_ma_30 = rolling_mean(&volume_opts, 30, 10);
    let corr = rolling_pair_corr(&price_change, &volume_change, 7, 5);

    rows.iter()
        .enumerate()
        .map(|(i, r)| {
            let tx = r.num_transactions as f64;
            let ma7 = volume_ma_7[i].unwrap_or(0.0);
            let ma30 = volume_ma_30[i].unwrap_or(0.0);
            let spread = if r.close != 0.0 {
                (r.high - r.low) / r.close * 100.0
            } else {
                0.0
            };
            FeatureRow {
                date: r.date,
                close: r.close,
                volume: r.volume,
                num_transactions: tx,
                price_change_pct: finite_or_zero(price_change[i].unwrap_or(0.0)),
                volume_change_pct: finite_or_zero(volume_change[i].unwrap_or(0.0)),
                volatility_7d: finite_or_zero(volatility[i].unwrap_or(0.0)),
                volume_ma_7d: finite_or_zero(ma7),
                volume_ma_30d: finite_or_zero(ma30),
                volume_ratio_7d: if volume_ma_7[i].is_some() {
                    finite_or_zero(r.volume / (ma7 + 1e-6))
                } else {
                    0.0
                },
                volume_ratio_30d: if volume_ma_30[i].is_some() {
                    finite_or_zero(r.volume / (ma30 + 1e-6))
                } else {
                    0.0
                },
                transaction_per_volume: finite_or_zero(tx / (r.volume + 1.0)),
                avg_transaction_size: finite_or_zero(r.volume / (tx + 1.0)),
                price_volume_corr: finite_or_zero(corr[i].unwrap_or(0.0)),
                high_low_spread_pct: finite_or_zero(spread),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn rows(closes: &[f64], volumes: &[f64]) -> Vec<StockRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&close, &volume))| StockRecord {
                date: start + Duration::days(i as i64),
                stock_code: "TN0001800457".into(),
                stock_name: "BIAT".into(),
                group: None,
                open: close,
                close,
                high: close * 1.01,
                low: close * 0.99,
                volume,
                num_transactions: 10,
                capital: close * volume,
            })
            .collect()
    }

    #[test]
    fn test_first_row_is_zero_filled() {
        let features = engineer_features(&rows(&[10.0, 11.0, 12.0], &[100.0, 200.0, 100.0]));
        assert_eq!(features[0].price_change_pct, 0.0);
        assert_eq!(features[0].volatility_7d, 0.0);
        assert!((features[1].price_change_pct - 0.1).abs() < 1e-12);
        assert!((features[1].volume_change_pct - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_volume_ratio_needs_min_periods() {
        let closes = vec![10.0; 12];
        let mut volumes = vec![100.0; 12];
        volumes[11] = 1000.0;
        let features = engineer_features(&rows(&closes, &volumes));
        assert_eq!(features[1].volume_ratio_7d, 0.0);
        assert!(features[2].volume_ratio_7d > 0.99);
        assert_eq!(features[8].volume_ratio_30d, 0.0);
        assert!(features[11].volume_ratio_30d > 4.0);
    }

    #[test]
    fn test_zero_volume_base_does_not_produce_infinity() {
        let features = engineer_features(&rows(&[10.0, 10.5], &[0.0, 500.0]));
        assert_eq!(features[1].volume_change_pct, 0.0);
        assert!(features.iter().all(|f| f.as_vector().iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_spread_pct() {
        let features = engineer_features(&rows(&[100.0], &[10.0]));
        assert!((features[0].high_low_spread_pct - 2.0).abs() < 1e-9);
    }
}
