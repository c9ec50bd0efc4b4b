//! Signal normalization and the weighted decision score.
//!
//! Every signal is mapped to [-1, 1], weighted, and scaled to a raw score
//! in [-10, 10]. The risk profile then multiplies the score and picks the
//! BUY/SELL threshold.

use analysis_core::adaptive::round_to;
use analysis_core::{
    Action, AnomalySignal, ForecastSignal, MacdTrend, RiskLevel, RiskProfile, SentimentSignal, SignalBundle,
    TechnicalSignal,
};
use serde::{Deserialize, Serialize};

use crate::config::{DecisionConfig, CONFIDENCE_CAP};

/// Trend at which the forecast signal reaches 0.5
const FORECAST_SCALE: f64 = 0.016;

/// Bounded in (-1, 1) and strictly increasing. `x / (1 + |x|)` only reaches
/// 1.0 in f64 for absurd trends, unlike `tanh`.
pub fn forecast_component(signal: &ForecastSignal) -> f64 {
    if !signal.trend.is_finite() {
        return 0.0;
    }
    let x = signal.trend / FORECAST_SCALE;
    x / (1.0 + x.abs())
}

pub fn sentiment_component(signal: &SentimentSignal) -> f64 {
    if !signal.score.is_finite() {
        return 0.0;
    }
    signal.score.clamp(-1.0, 1.0)
}

/// Normal trading is mildly positive, anomalies push towards SELL.
pub fn anomaly_component(signal: &AnomalySignal) -> f64 {
    if !signal.any_anomaly && !signal.volume_spike && !signal.price_spike {
        return 0.5;
    }
    let mut penalty = 0.25 * signal.anomaly_score.clamp(0.0, 1.0);
    if signal.volume_spike {
        penalty += 0.5;
    }
    if signal.price_spike {
        penalty += 0.25;
    }
    -penalty.min(1.0)
}

pub fn technical_component(signal: &TechnicalSignal) -> f64 {
    let mut value: f64 = 0.0;
    if let Some(rsi) = signal.rsi {
        if rsi < technical_analysis::RSI_OVERSOLD {
            value += 0.75;
        } else if rsi > technical_analysis::RSI_OVERBOUGHT {
            value -= 0.75;
        }
    }
    match signal.macd.as_ref().map(|m| m.trend) {
        Some(MacdTrend::Bullish) => value += 0.25,
        Some(MacdTrend::Bearish) => value -= 0.25,
        None => {}
    }
    value.clamp(-1.0, 1.0)
}

/// Per-signal normalized values. `None` marks a missing signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub forecast: Option<f64>,
    pub sentiment: Option<f64>,
    pub anomaly: Option<f64>,
    pub technical: Option<f64>,
}

impl Components {
    pub fn from_bundle(bundle: &SignalBundle) -> Self {
        Self {
            forecast: bundle.forecast.as_ref().map(forecast_component),
            sentiment: bundle.sentiment.as_ref().map(sentiment_component),
            anomaly: bundle.anomaly.as_ref().map(anomaly_component),
            technical: bundle.technical.as_ref().map(technical_component),
        }
    }
}

/// Outcome of scoring one bundle for one profile. Values are unrounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub components: Components,
    pub raw_score: f64,
    pub score: f64,
    pub action: Action,
    pub confidence: f64,
    pub strong_signal: bool,
    /// Share of the total weight carried by signals that were available
    pub coverage: f64,
    pub risk_level: RiskLevel,
}

/// `10 · Σ wᵢ·sᵢ`; a missing signal contributes nothing.
pub fn raw_score(components: &Components, config: &DecisionConfig) -> f64 {
    let w = &config.weights;
    let sum = components.forecast.unwrap_or(0.0) * w.forecast
        + components.sentiment.unwrap_or(0.0) * w.sentiment
        + components.anomaly.unwrap_or(0.0) * w.anomaly
        + components.technical.unwrap_or(0.0) * w.technical;
    10.0 * sum
}

pub fn coverage(components: &Components, config: &DecisionConfig) -> f64 {
    let w = &config.weights;
    let total = w.total();
    if total <= 0.0 {
        return 0.0;
    }
    let present = [
        (components.forecast, w.forecast),
        (components.sentiment, w.sentiment),
        (components.anomaly, w.anomaly),
        (components.technical, w.technical),
    ]
    .iter()
    .filter(|(value, _)| value.is_some())
    .map(|(_, weight)| weight)
    .sum::<f64>();
    (present / total).clamp(0.0, 1.0)
}

pub fn action_for(score: f64, threshold: f64) -> Action {
    if score >= threshold {
        Action::Buy
    } else if score <= -threshold {
        Action::Sell
    } else {
        Action::Hold
    }
}

/// Confidence before the coverage adjustment.
pub fn base_confidence(action: Action, score: f64, threshold: f64) -> f64 {
    let value = match action {
        Action::Buy | Action::Sell => 0.5 + (score.abs() - threshold) * 0.1,
        Action::Hold => 0.5 + score.abs() * 0.05,
    };
    value.min(CONFIDENCE_CAP)
}

pub fn assess_risk(bundle: &SignalBundle, raw_score: f64) -> RiskLevel {
    let mut points = 0;

    if let Some(anomaly) = &bundle.anomaly {
        if anomaly.any_anomaly {
            points += 2;
        }
        if anomaly.anomaly_score > 0.7 {
            points += 1;
        }
    }
    if bundle.forecast.as_ref().is_some_and(|f| f.confidence < 0.5) {
        points += 1;
    }
    if bundle.sentiment.as_ref().is_some_and(|s| s.score.abs() > 0.8) {
        points += 1;
    }
    if let Some(rsi) = bundle.technical.as_ref().and_then(|t| t.rsi) {
        if !(20.0..=80.0).contains(&rsi) {
            points += 1;
        }
    }
    if raw_score.abs() > 7.0 {
        points += 1;
    }

    match points {
        0..=1 => RiskLevel::Low,
        2..=3 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

pub fn evaluate(bundle: &SignalBundle, profile: RiskProfile, config: &DecisionConfig) -> Evaluation {
    let components = Components::from_bundle(bundle);
    let raw = raw_score(&components, config);
    let score = raw * config.multiplier(profile);
    let threshold = config.threshold(profile);
    let action = action_for(score, threshold);
    let coverage = coverage(&components, config);
    let confidence = round_to(base_confidence(action, score, threshold) * (0.5 + 0.5 * coverage), 2);

    Evaluation {
        components,
        raw_score: raw,
        score,
        action,
        confidence,
        strong_signal: score.abs() >= config.strong_signal,
        coverage,
        risk_level: assess_risk(bundle, raw),
    }
}
