use analysis_core::adaptive::round_to;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendLabel {
    StrongUp,
    Up,
    Sideways,
    Down,
    StrongDown,
}

impl TrendLabel {
    /// Classify a percentage change.
    pub fn from_change_pct(change_pct: f64) -> Self {
        if change_pct > 5.0 {
            TrendLabel::StrongUp
        } else if change_pct > 2.0 {
            TrendLabel::Up
        } else if change_pct < -5.0 {
            TrendLabel::StrongDown
        } else if change_pct < -2.0 {
            TrendLabel::Down
        } else {
            TrendLabel::Sideways
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub stock_code: String,
    pub current_price: f64,
    pub change_7d: Option<f64>,
    pub change_30d: Option<f64>,
    pub change_90d: Option<f64>,
    pub trend: TrendLabel,
}

/// Percentage change over the last `sessions` sessions.
pub fn change_over(closes: &[f64], sessions: usize) -> Option<f64> {
    if closes.len() <= sessions {
        return None;
    }
    let last = closes[closes.len() - 1];
    let base = closes[closes.len() - 1 - sessions];
    if base <= 0.0 {
        return None;
    }
    Some(round_to((last - base) / base * 100.0, 2))
}

pub fn analyze_trend(stock_code: &str, closes: &[f64]) -> Option<TrendAnalysis> {
    let current_price = *closes.last()?;
    let change_30d = change_over(closes, 30);

    Some(TrendAnalysis {
        stock_code: stock_code.to_string(),
        current_price,
        change_7d: change_over(closes, 7),
        change_30d,
        change_90d: change_over(closes, 90),
        trend: change_30d.map_or(TrendLabel::Sideways, TrendLabel::from_change_pct),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(TrendLabel::from_change_pct(6.0), TrendLabel::StrongUp);
        assert_eq!(TrendLabel::from_change_pct(3.0), TrendLabel::Up);
        assert_eq!(TrendLabel::from_change_pct(0.0), TrendLabel::Sideways);
        assert_eq!(TrendLabel::from_change_pct(-3.0), TrendLabel::Down);
        assert_eq!(TrendLabel::from_change_pct(-5.1), TrendLabel::StrongDown);
        assert_eq!(serde_json::to_string(&TrendLabel::StrongUp).unwrap(), "\"STRONG_UP\"");
    }

    #[test]
    fn test_change_windows() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let analysis = analyze_trend("TN0001800457", &closes).unwrap();
        assert_eq!(analysis.change_7d, Some(round_to(7.0 / 132.0 * 100.0, 2)));
        assert_eq!(analysis.change_30d, Some(round_to(30.0 / 109.0 * 100.0, 2)));
        assert_eq!(analysis.change_90d, None);
        assert_eq!(analysis.trend, TrendLabel::StrongUp);
    }

    #[test]
    fn test_short_history_is_sideways() {
        let analysis = analyze_trend("X", &[10.0, 11.0]).unwrap();
        assert_eq!(analysis.trend, TrendLabel::Sideways);
        assert!(analyze_trend("X", &[]).is_none());
    }
}
