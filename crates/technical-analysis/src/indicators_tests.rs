#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    // Daily closes of a liquid bank stock over 20 sessions
    fn sample_prices() -> Vec<f64> {
        vec![
            90.10, 90.40, 90.25, 89.80, 90.60, 91.20, 91.50, 91.45, 92.00, 92.30,
            92.10, 92.40, 91.90, 92.70, 92.70, 92.35, 92.40, 92.85, 92.60, 91.95,
        ]
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len());
        assert_eq!(result[0], 22.0);
        // alpha = 0.5 for period 3
        assert!((result[1] - 23.0).abs() < 1e-12);
        assert!((result[2] - 23.0).abs() < 1e-12);
        assert!((result[3] - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_empty_data() {
        let data: Vec<f64> = vec![];
        let result = ema(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let result = ema(&data, 3);

        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_rsi_bounds() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        // One value per close from index 14
        assert_eq!(result.len(), prices.len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let data = vec![1.0, 2.0, 3.0];
        let result = rsi(&data, 14);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_rsi_simple_mean_value() {
        // 14 deltas: ten +1 and four -1 -> RS = (10/14)/(4/14) = 2.5
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = closes[closes.len() - 1];
            closes.push(if i < 10 { last + 1.0 } else { last - 1.0 });
        }
        let result = rsi(&closes, 14);
        assert_eq!(result.len(), 1);
        assert!((result[0] - (100.0 - 100.0 / 3.5)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_no_losses_is_100() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&uptrend, 14);
        assert_eq!(*result.last().unwrap(), 100.0);
    }

    #[test]
    fn test_macd_lines_aligned_with_input() {
        let prices = sample_prices();
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd_line.len(), prices.len());
        assert_eq!(result.signal_line.len(), prices.len());
        assert_eq!(result.histogram.len(), prices.len());
        // First point: both EMAs equal the first close
        assert_eq!(result.macd_line[0], 0.0);
    }

    #[test]
    fn test_macd_histogram() {
        let prices = sample_prices();
        let result = macd(&prices, 12, 26, 9);

        for (i, &hist) in result.histogram.iter().enumerate() {
            let expected = result.macd_line[i] - result.signal_line[i];
            assert!((hist - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_invalid_periods() {
        let result = macd(&sample_prices(), 26, 12, 9);
        assert!(result.macd_line.is_empty());
    }
}
