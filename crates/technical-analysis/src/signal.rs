use analysis_core::{MacdSnapshot, MacdTrend, TechnicalSignal};

use crate::indicators::{macd, rsi};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Latest 14-period RSI, `None` with fewer than 15 closes.
pub fn latest_rsi(closes: &[f64]) -> Option<f64> {
    rsi(closes, RSI_PERIOD).last().copied().filter(|v| v.is_finite())
}

/// Latest MACD(12, 26, 9) values, `None` with fewer than 26 closes.
pub fn latest_macd(closes: &[f64]) -> Option<MacdSnapshot> {
    if closes.len() < MACD_SLOW {
        return None;
    }
    let result = macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let macd_value = *result.macd_line.last()?;
    let signal_value = *result.signal_line.last()?;
    let hist_value = *result.histogram.last()?;
    if !(macd_value.is_finite() && signal_value.is_finite() && hist_value.is_finite()) {
        return None;
    }

    Some(MacdSnapshot {
        macd: macd_value,
        signal: signal_value,
        histogram: hist_value,
        trend: if hist_value > 0.0 { MacdTrend::Bullish } else { MacdTrend::Bearish },
    })
}

/// Technical signal for the decision engine. `None` when neither RSI nor
/// MACD can be computed.
pub fn technical_signal(closes: &[f64]) -> Option<TechnicalSignal> {
    let rsi_value = latest_rsi(closes);
    let macd_value = latest_macd(closes);
    if rsi_value.is_none() && macd_value.is_none() {
        return None;
    }

    let signal = match (rsi_value, &macd_value) {
        (Some(r), _) if r < RSI_OVERSOLD => "oversold",
        (Some(r), _) if r > RSI_OVERBOUGHT => "overbought",
        (_, Some(m)) => match m.trend {
            MacdTrend::Bullish => "bullish",
            MacdTrend::Bearish => "bearish",
        },
        _ => "neutral",
    };

    Some(TechnicalSignal {
        rsi: rsi_value,
        macd: macd_value,
        signal: signal.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_requires_data() {
        assert!(technical_signal(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_rising_series_is_overbought_and_bullish() {
        let closes: Vec<f64> = (0..40).map(|i| 10.0 + i as f64 * 0.5).collect();
        let signal = technical_signal(&closes).unwrap();
        assert_eq!(signal.rsi, Some(100.0));
        assert_eq!(signal.signal, "overbought");
        assert_eq!(signal.macd.unwrap().trend, MacdTrend::Bullish);
    }

    #[test]
    fn test_falling_series_is_oversold() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 - i as f64 * 0.5).collect();
        let signal = technical_signal(&closes).unwrap();
        assert!(signal.rsi.unwrap() < 1.0);
        assert_eq!(signal.signal, "oversold");
        assert_eq!(signal.macd.unwrap().trend, MacdTrend::Bearish);
    }

    #[test]
    fn test_rsi_only_when_macd_unavailable() {
        let closes: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 10.0 } else { 10.5 }).collect();
        let signal = technical_signal(&closes).unwrap();
        assert!(signal.macd.is_none());
        assert!((signal.rsi.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(signal.signal, "neutral");
    }
}
