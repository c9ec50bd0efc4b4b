use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    VolumeSpike,
    PriceGap,
    LowLiquidity,
    Divergence,
    MlDetected,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::VolumeSpike => "volume_spike",
            AnomalyType::PriceGap => "price_gap",
            AnomalyType::LowLiquidity => "low_liquidity",
            AnomalyType::Divergence => "divergence",
            AnomalyType::MlDetected => "ml_detected",
        }
    }

    /// Contribution multiplier in the anomaly score
    pub fn weight(&self) -> f64 {
        match self {
            AnomalyType::VolumeSpike => 1.0,
            AnomalyType::PriceGap => 1.5,
            AnomalyType::LowLiquidity => 1.2,
            AnomalyType::Divergence => 1.3,
            AnomalyType::MlDetected => 1.0,
        }
    }

    /// French label used in summaries, pluralised with "(s)".
    pub fn label_fr(&self) -> &'static str {
        match self {
            AnomalyType::VolumeSpike => "spike(s) de volume",
            AnomalyType::PriceGap => "gap(s) de prix",
            AnomalyType::LowLiquidity => "événement(s) de faible liquidité",
            AnomalyType::Divergence => "divergence(s) prix-volume",
            AnomalyType::MlDetected => "comportement(s) atypique(s) ML",
        }
    }

    pub fn all() -> [AnomalyType; 5] {
        [
            AnomalyType::VolumeSpike,
            AnomalyType::PriceGap,
            AnomalyType::LowLiquidity,
            AnomalyType::Divergence,
            AnomalyType::MlDetected,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn points(&self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.5,
            Severity::High => 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub alert_id: String,
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnomalyRisk {
    Normal,
    Elevated,
    High,
}

impl AnomalyRisk {
    pub fn from_score(score: f64) -> Self {
        if score >= 7.0 {
            AnomalyRisk::High
        } else if score >= 3.0 {
            AnomalyRisk::Elevated
        } else {
            AnomalyRisk::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyRisk::Normal => "NORMAL",
            AnomalyRisk::Elevated => "ELEVATED",
            AnomalyRisk::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub stock_code: String,
    pub stock_name: String,
    /// Last analysed session
    pub date: Option<NaiveDate>,
    /// "ok" or "insufficient_data"
    pub status: String,
    pub anomalies_detected: Vec<Anomaly>,
    /// 0 (normal) to 10 (extreme)
    pub score: f64,
    pub risk_level: AnomalyRisk,
    pub summary: String,
    pub ml_enabled: bool,
}

impl AnomalyReport {
    pub fn has_type(&self, kind: AnomalyType) -> bool {
        self.anomalies_detected.iter().any(|a| a.anomaly_type == kind)
    }
}

/// Severity-weighted sum, capped at 10.
pub fn anomaly_score(anomalies: &[Anomaly]) -> f64 {
    anomalies
        .iter()
        .map(|a| a.severity.points() * a.anomaly_type.weight())
        .sum::<f64>()
        .min(10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anomaly(kind: AnomalyType, severity: Severity) -> Anomaly {
        Anomaly {
            alert_id: String::new(),
            anomaly_type: kind,
            severity,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            description: String::new(),
            metrics: BTreeMap::new(),
        }
    }

    #[test]
    fn test_score_weights() {
        assert_eq!(anomaly_score(&[]), 0.0);
        let score = anomaly_score(&[
            anomaly(AnomalyType::PriceGap, Severity::Medium),
            anomaly(AnomalyType::Divergence, Severity::Low),
        ]);
        assert!((score - (2.5 * 1.5 + 1.3)).abs() < 1e-12);
    }

    #[test]
    fn test_score_capped() {
        let many: Vec<Anomaly> = (0..5).map(|_| anomaly(AnomalyType::PriceGap, Severity::High)).collect();
        assert_eq!(anomaly_score(&many), 10.0);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(AnomalyRisk::from_score(0.0), AnomalyRisk::Normal);
        assert_eq!(AnomalyRisk::from_score(3.0), AnomalyRisk::Elevated);
        assert_eq!(AnomalyRisk::from_score(7.0), AnomalyRisk::High);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_value(anomaly(AnomalyType::VolumeSpike, Severity::High)).unwrap();
        assert_eq!(json["type"], "volume_spike");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["date"], "2024-05-02");
    }
}
