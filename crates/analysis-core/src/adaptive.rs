/// Statistics helpers shared by the signal modules.
///
/// Rolling functions follow the usual dataframe convention: the window ends
/// at the current row, is truncated at the start of the series, and yields
/// `None` until at least `min_periods` values are available.

/// Compute the mean of a data slice.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Compute sample standard deviation.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64;
    variance.sqrt()
}

/// Population standard deviation (divides by n).
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Period-over-period fractional change. Pairs with a zero base are skipped.
pub fn pct_change(data: &[f64]) -> Vec<f64> {
    data.windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Fractional change aligned with the input: the first element is `None`.
pub fn pct_change_aligned(data: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(data.len());
    for i in 0..data.len() {
        if i == 0 || data[i - 1] == 0.0 {
            out.push(None);
        } else {
            out.push(Some((data[i] - data[i - 1]) / data[i - 1]));
        }
    }
    out
}

fn rolling<F>(data: &[Option<f64>], window: usize, min_periods: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = Vec::with_capacity(data.len());
    for i in 0..data.len() {
        let start = (i + 1).saturating_sub(window);
        let values: Vec<f64> = data[start..=i].iter().flatten().copied().collect();
        if window == 0 || values.len() < min_periods.max(1) {
            out.push(None);
        } else {
            out.push(f(&values));
        }
    }
    out
}

/// Rolling mean with a minimum number of observations.
pub fn rolling_mean(data: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling(data, window, min_periods, |v| Some(mean(v)))
}

/// Rolling sample standard deviation; needs at least two observations.
pub fn rolling_std(data: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling(data, window, min_periods, |v| {
        if v.len() < 2 {
            None
        } else {
            Some(std_dev(v))
        }
    })
}

/// Pearson correlation. `None` when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx < f64::EPSILON || vy < f64::EPSILON {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Rolling Pearson correlation between two aligned series.
pub fn rolling_corr(x: &[f64], y: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    let n = x.len().min(y.len());
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = (i + 1).saturating_sub(window);
        if i + 1 - start < min_periods {
            out.push(None);
        } else {
            out.push(pearson(&x[start..=i], &y[start..=i]));
        }
    }
    out
}

/// Compute the percentile rank of `value` within `data` (returns 0.0 to 1.0).
/// Uses midpoint interpolation: ties count as half.
pub fn percentile_rank(value: f64, data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.5;
    }
    let count_below = data.iter().filter(|&&x| x < value).count();
    let count_equal = data.iter().filter(|&&x| (x - value).abs() < f64::EPSILON).count();
    (count_below as f64 + 0.5 * count_equal as f64) / data.len() as f64
}

/// Compute the z-score of `value` relative to `data`.
/// Returns 0.0 if data has insufficient variance.
pub fn z_score_of(value: f64, data: &[f64]) -> f64 {
    let sd = std_dev(data);
    if sd < f64::EPSILON {
        return 0.0;
    }
    (value - mean(data)) / sd
}

/// Median of a slice (0.0 when empty).
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Replace NaN and infinities with zero.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_rank() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile_rank(3.0, &data) - 0.5).abs() < 0.01);
        assert!(percentile_rank(5.0, &data) > 0.8);
        assert!(percentile_rank(1.0, &data) < 0.2);
    }

    #[test]
    fn test_z_score() {
        let data = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let z = z_score_of(30.0, &data);
        assert!(z.abs() < 0.01); // mean value should have z ≈ 0
    }

    #[test]
    fn test_rolling_mean_respects_min_periods() {
        let data: Vec<Option<f64>> = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let out = rolling_mean(&data, 3, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[3], Some(3.0));
    }

    #[test]
    fn test_rolling_std_skips_missing() {
        let data = vec![None, Some(1.0), Some(3.0)];
        let out = rolling_std(&data, 7, 2);
        assert_eq!(out[1], None);
        let sd = out[2].unwrap();
        assert!((sd - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y = vec![2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        let flat = vec![1.0, 1.0, 1.0, 1.0];
        assert!(pearson(&x, &flat).is_none());
    }

    #[test]
    fn test_pct_change_and_median() {
        let changes = pct_change(&[100.0, 110.0, 99.0]);
        assert!((changes[0] - 0.1).abs() < 1e-12);
        assert!((changes[1] + 0.1).abs() < 1e-12);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.456, 2), 0.46);
        assert_eq!(round_to(-1.234, 1), -1.2);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
    }
}
