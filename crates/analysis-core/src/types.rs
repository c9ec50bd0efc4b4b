use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One trading session of one stock, as published by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub date: NaiveDate,
    pub stock_code: String,
    pub stock_name: String,
    #[serde(default)]
    pub group: Option<String>,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub num_transactions: u64,
    #[serde(default)]
    pub capital: f64,
}

/// Investor risk profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskProfile {
    /// Lenient parse: unknown values fall back to `Moderate`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "conservative" | "conservateur" | "prudent" => RiskProfile::Conservative,
            "aggressive" | "agressif" | "dynamique" => RiskProfile::Aggressive,
            _ => RiskProfile::Moderate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Moderate => "moderate",
            RiskProfile::Aggressive => "aggressive",
        }
    }

    pub fn all() -> [RiskProfile; 3] {
        [RiskProfile::Conservative, RiskProfile::Moderate, RiskProfile::Aggressive]
    }
}

/// Final trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }

    pub fn label_fr(&self) -> &'static str {
        match self {
            Action::Buy => "ACHETER",
            Action::Sell => "VENDRE",
            Action::Hold => "CONSERVER",
        }
    }

    pub fn label_en(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Forecast signal: expected fractional move over the horizon (0.03 = +3%)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSignal {
    pub trend: f64,
    pub confidence: f64,
    #[serde(default)]
    pub predictions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    /// Always within [-1, 1]
    pub score: f64,
    pub num_articles: usize,
    #[serde(default)]
    pub sample_headlines: Vec<String>,
    pub method: String,
    #[serde(default)]
    pub correction_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySignal {
    pub volume_spike: bool,
    pub price_spike: bool,
    pub any_anomaly: bool,
    /// Normalized severity, 0.0 to 1.0
    pub anomaly_score: f64,
    pub risk_level: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdTrend {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSnapshot {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: MacdTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    /// "oversold", "overbought", "bullish", "bearish" or "neutral"
    pub signal: String,
}

/// The four signals consumed by the decision engine. `None` means the
/// upstream module failed or had nothing to say.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBundle {
    pub forecast: Option<ForecastSignal>,
    pub sentiment: Option<SentimentSignal>,
    pub anomaly: Option<AnomalySignal>,
    pub technical: Option<TechnicalSignal>,
}

/// A single hit from the semantic market memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    pub score: f64,
    pub text: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvidence {
    pub news: Vec<EvidenceItem>,
    pub anomalies: Vec<EvidenceItem>,
    pub recommendations: Vec<EvidenceItem>,
}

impl MemoryEvidence {
    pub fn total(&self) -> usize {
        self.news.len() + self.anomalies.len() + self.recommendations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Decision engine output for one stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    #[serde(rename = "recommendation")]
    pub action: Action,
    pub confidence: f64,
    /// Profile-adjusted score
    pub score: f64,
    /// Weighted score before the profile multiplier, in [-10, 10]
    pub raw_score: f64,
    pub strong_signal: bool,
    pub signals: SignalBundle,
    /// One French line per signal, in evaluation order
    pub signal_notes: Vec<String>,
    #[serde(default)]
    pub memory: Option<MemoryEvidence>,
    pub risk_level: RiskLevel,
    pub suggested_action: String,
    pub user_profile: RiskProfile,
    pub explanation: String,
    pub short_explanation: String,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_parse_is_lenient() {
        assert_eq!(RiskProfile::parse(" Conservative "), RiskProfile::Conservative);
        assert_eq!(RiskProfile::parse("AGGRESSIVE"), RiskProfile::Aggressive);
        assert_eq!(RiskProfile::parse("whatever"), RiskProfile::Moderate);
        assert_eq!(RiskProfile::parse(""), RiskProfile::Moderate);
    }

    #[test]
    fn test_action_serializes_uppercase() {
        let json = serde_json::to_string(&Action::Buy).unwrap();
        assert_eq!(json, "\"BUY\"");
        let level: RiskLevel = serde_json::from_str("\"MEDIUM\"").unwrap();
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn test_memory_evidence_total() {
        let item = EvidenceItem {
            id: "1".into(),
            score: 0.8,
            text: "BIAT resultats".into(),
            ticker: "TN0001800457".into(),
            date: String::new(),
            kind: "news".into(),
            source: String::new(),
        };
        let evidence = MemoryEvidence {
            news: vec![item.clone(), item.clone()],
            anomalies: vec![],
            recommendations: vec![item],
        };
        assert_eq!(evidence.total(), 3);
        assert!(!evidence.is_empty());
        assert!(MemoryEvidence::default().is_empty());
    }
}
