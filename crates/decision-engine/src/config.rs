use analysis_core::{AnalysisError, RiskProfile};
use serde::{Deserialize, Serialize};

/// Upper bound for any recommendation confidence
pub const CONFIDENCE_CAP: f64 = 0.95;

/// Recommendation cache lifetime (5 minutes)
pub const CACHE_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalWeights {
    pub forecast: f64,
    pub sentiment: f64,
    pub anomaly: f64,
    pub technical: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            forecast: 0.40,
            sentiment: 0.30,
            anomaly: 0.20,
            technical: 0.10,
        }
    }
}

impl SignalWeights {
    pub fn total(&self) -> f64 {
        self.forecast + self.sentiment + self.anomaly + self.technical
    }
}

/// One value per risk profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileTable {
    pub conservative: f64,
    pub moderate: f64,
    pub aggressive: f64,
}

impl ProfileTable {
    pub fn get(&self, profile: RiskProfile) -> f64 {
        match profile {
            RiskProfile::Conservative => self.conservative,
            RiskProfile::Moderate => self.moderate,
            RiskProfile::Aggressive => self.aggressive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    pub weights: SignalWeights,
    /// Conservative users dampen signals, aggressive users amplify them
    pub multipliers: ProfileTable,
    /// |score| needed to leave HOLD
    pub thresholds: ProfileTable,
    pub strong_signal: f64,
    pub cache_ttl_secs: i64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            multipliers: ProfileTable {
                conservative: 0.5,
                moderate: 1.0,
                aggressive: 1.2,
            },
            thresholds: ProfileTable {
                conservative: 4.0,
                moderate: 3.0,
                aggressive: 2.0,
            },
            strong_signal: 5.0,
            cache_ttl_secs: CACHE_TTL_SECS,
        }
    }
}

fn env_f64(name: &str, default: f64) -> Result<f64, AnalysisError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| AnalysisError::InvalidData(format!("{}={}: {}", name, raw, e))),
        _ => Ok(default),
    }
}

impl DecisionConfig {
    /// Defaults overridden by `DECISION_WEIGHT_*` and `DECISION_CACHE_TTL_SECS`.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let defaults = Self::default();
        let config = Self {
            weights: SignalWeights {
                forecast: env_f64("DECISION_WEIGHT_FORECAST", defaults.weights.forecast)?,
                sentiment: env_f64("DECISION_WEIGHT_SENTIMENT", defaults.weights.sentiment)?,
                anomaly: env_f64("DECISION_WEIGHT_ANOMALY", defaults.weights.anomaly)?,
                technical: env_f64("DECISION_WEIGHT_TECHNICAL", defaults.weights.technical)?,
            },
            cache_ttl_secs: env_f64("DECISION_CACHE_TTL_SECS", defaults.cache_ttl_secs as f64)? as i64,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let w = &self.weights;
        if [w.forecast, w.sentiment, w.anomaly, w.technical]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(AnalysisError::InvalidData("signal weights must be non-negative".to_string()));
        }
        if w.forecast <= 0.0 {
            return Err(AnalysisError::InvalidData("forecast weight must be positive".to_string()));
        }
        if (w.total() - 1.0).abs() > 0.01 {
            return Err(AnalysisError::InvalidData(format!(
                "signal weights must sum to 1.0, got {:.3}",
                w.total()
            )));
        }
        for profile in RiskProfile::all() {
            if self.multipliers.get(profile) <= 0.0 || self.thresholds.get(profile) <= 0.0 {
                return Err(AnalysisError::InvalidData(format!(
                    "multiplier and threshold for {} must be positive",
                    profile.as_str()
                )));
            }
        }
        Ok(())
    }

    pub fn multiplier(&self, profile: RiskProfile) -> f64 {
        self.multipliers.get(profile)
    }

    pub fn threshold(&self, profile: RiskProfile) -> f64 {
        self.thresholds.get(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DecisionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.total() - 1.0).abs() < 1e-12);
        assert_eq!(config.threshold(RiskProfile::Conservative), 4.0);
        assert_eq!(config.multiplier(RiskProfile::Aggressive), 1.2);
    }

    #[test]
    fn test_validate_rejects_bad_weights() {
        let mut config = DecisionConfig::default();
        config.weights.forecast = 0.6;
        assert!(config.validate().is_err());

        config.weights = SignalWeights {
            forecast: 1.2,
            sentiment: -0.2,
            anomaly: 0.0,
            technical: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_forecast_weight() {
        let mut config = DecisionConfig::default();
        config.weights = SignalWeights {
            forecast: 0.0,
            sentiment: 0.5,
            anomaly: 0.3,
            technical: 0.2,
        };
        assert!(config.validate().is_err());
    }
}
