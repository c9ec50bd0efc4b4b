//! Deterministic demo providers, selected with `BVMT_USE_MOCKS=true`.

use analysis_core::{
    AnalysisError, AnomalyProvider, AnomalySignal, ForecastProvider, ForecastSignal, MarketData,
    SentimentProvider, SentimentSignal,
};
use async_trait::async_trait;

/// Sessions of synthetic history per stock
const MOCK_HISTORY: usize = 20;

struct Scenario {
    code: &'static str,
    name: &'static str,
    price: f64,
    trend: f64,
    forecast_confidence: f64,
    predictions: [f64; 5],
}

static SCENARIOS: [Scenario; 8] = [
    Scenario {
        code: "TN0001600154",
        name: "ATTIJARI BANK",
        price: 51.50,
        trend: 0.032,
        forecast_confidence: 0.85,
        predictions: [51.5, 52.0, 52.8, 53.2, 53.5],
    },
    Scenario {
        code: "TN0001800457",
        name: "BIAT",
        price: 93.90,
        trend: -0.015,
        forecast_confidence: 0.70,
        predictions: [94.0, 93.5, 93.2, 92.8, 92.6],
    },
    Scenario {
        code: "TN0001900604",
        name: "TUNISAIR",
        price: 0.55,
        trend: 0.005,
        forecast_confidence: 0.60,
        predictions: [0.55, 0.55, 0.56, 0.55, 0.55],
    },
    Scenario {
        code: "TN0001100254",
        name: "SFBT",
        price: 11.53,
        trend: 0.045,
        forecast_confidence: 0.78,
        predictions: [11.5, 11.8, 12.0, 12.2, 12.4],
    },
    Scenario {
        code: "TN0001800853",
        name: "BH",
        price: 10.50,
        trend: 0.025,
        forecast_confidence: 0.72,
        predictions: [10.5, 10.6, 10.7, 10.8, 10.9],
    },
    Scenario {
        code: "TN0003800200",
        name: "STB",
        price: 5.20,
        trend: -0.028,
        forecast_confidence: 0.65,
        predictions: [5.2, 5.1, 5.0, 5.0, 4.9],
    },
    Scenario {
        code: "TN0006700406",
        name: "POULINA",
        price: 12.00,
        trend: 0.038,
        forecast_confidence: 0.80,
        predictions: [12.0, 12.3, 12.5, 12.7, 12.9],
    },
    Scenario {
        code: "TN0003600154",
        name: "AMEN BANK",
        price: 38.00,
        trend: 0.008,
        forecast_confidence: 0.55,
        predictions: [38.0, 38.1, 38.2, 38.1, 38.3],
    },
];

/// Stocks priced by the demo data without a forecast scenario
static EXTRA_PRICES: [(&str, &str, f64); 2] = [
    ("TN0004900255", "UIB", 25.50),
    ("TN0007100507", "DELICE HOLDING", 15.80),
];

const DEFAULT_PRICE: f64 = 10.0;

struct NewsScenario {
    code: &'static str,
    score: f64,
    num_articles: usize,
    headlines: &'static [&'static str],
}

static NEWS: [NewsScenario; 6] = [
    NewsScenario {
        code: "TN0001600154",
        score: 0.65,
        num_articles: 5,
        headlines: &[
            "Attijari Bank annonce des resultats solides pour 2024",
            "La banque renforce sa presence digitale",
            "Nouvelle offre de credit pour les PME",
        ],
    },
    NewsScenario {
        code: "TN0001800457",
        score: -0.30,
        num_articles: 3,
        headlines: &[
            "Le secteur bancaire face a des defis de liquidite",
            "Incertitudes sur les marges bancaires",
        ],
    },
    NewsScenario {
        code: "TN0001900604",
        score: 0.10,
        num_articles: 4,
        headlines: &[
            "Tunisair maintient ses operations normales",
            "Plan de restructuration en cours d'evaluation",
        ],
    },
    NewsScenario {
        code: "TN0001100254",
        score: 0.72,
        num_articles: 6,
        headlines: &[
            "SFBT: Hausse des ventes au T4 2024",
            "Le groupe diversifie ses activites",
            "Perspectives positives pour 2025",
        ],
    },
    NewsScenario {
        code: "TN0006700406",
        score: 0.55,
        num_articles: 4,
        headlines: &[
            "Poulina Group: Expansion dans l'agroalimentaire",
            "Resultats annuels superieurs aux attentes",
        ],
    },
    NewsScenario {
        code: "TN0003800200",
        score: -0.45,
        num_articles: 3,
        headlines: &[
            "STB: Les creances douteuses pesent sur les resultats",
            "Le secteur public bancaire sous pression",
        ],
    },
];

/// (code, volume_spike, price_spike, score, details)
static ANOMALIES: [(&str, bool, bool, f64, &str); 4] = [
    ("TN0001600154", false, false, 0.1, "Trading normal, pas d'anomalie detectee"),
    ("TN0001800457", true, false, 0.6, "Volume de transactions 3x superieur a la moyenne"),
    ("TN0003800200", false, true, 0.5, "Variation de prix de 4% sans actualite justificative"),
    ("TN0001900604", true, true, 0.85, "Activite suspecte: volume et prix anormaux simultanes"),
];

fn scenario(code: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.code == code)
}

/// Demo scenarios for a fixed set of BVMT stocks. Unknown codes get
/// neutral signals so the engine still produces a result.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProviders;

impl MockProviders {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ForecastProvider for MockProviders {
    async fn forecast(&self, stock_code: &str) -> Result<ForecastSignal, AnalysisError> {
        Ok(match scenario(stock_code) {
            Some(s) => ForecastSignal {
                trend: s.trend,
                confidence: s.forecast_confidence,
                predictions: s.predictions.to_vec(),
            },
            None => ForecastSignal {
                trend: 0.0,
                confidence: 0.5,
                predictions: vec![],
            },
        })
    }
}

#[async_trait]
impl SentimentProvider for MockProviders {
    async fn sentiment(&self, stock_code: &str) -> Result<SentimentSignal, AnalysisError> {
        Ok(match NEWS.iter().find(|n| n.code == stock_code) {
            Some(n) => SentimentSignal {
                score: n.score,
                num_articles: n.num_articles,
                sample_headlines: n.headlines.iter().map(|h| h.to_string()).collect(),
                method: "mock".to_string(),
                correction_applied: false,
            },
            None => SentimentSignal {
                score: 0.0,
                num_articles: 0,
                sample_headlines: vec!["Pas d'actualites recentes".to_string()],
                method: "mock".to_string(),
                correction_applied: false,
            },
        })
    }
}

#[async_trait]
impl AnomalyProvider for MockProviders {
    async fn anomalies(&self, stock_code: &str) -> Result<AnomalySignal, AnalysisError> {
        let (volume_spike, price_spike, score, details) = ANOMALIES
            .iter()
            .find(|(code, ..)| *code == stock_code)
            .map(|(_, v, p, s, d)| (*v, *p, *s, *d))
            .unwrap_or((false, false, 0.05, "Trading normal"));
        let any_anomaly = volume_spike || price_spike;

        Ok(AnomalySignal {
            volume_spike,
            price_spike,
            any_anomaly,
            anomaly_score: score,
            risk_level: if any_anomaly { "ELEVATED" } else { "NORMAL" }.to_string(),
            details: details.to_string(),
        })
    }
}

impl MarketData for MockProviders {
    fn stock_name(&self, stock_code: &str) -> String {
        scenario(stock_code)
            .map(|s| s.name)
            .or_else(|| EXTRA_PRICES.iter().find(|(c, ..)| *c == stock_code).map(|(_, n, _)| *n))
            .unwrap_or(stock_code)
            .to_string()
    }

    fn current_price(&self, stock_code: &str) -> Result<f64, AnalysisError> {
        Ok(scenario(stock_code)
            .map(|s| s.price)
            .or_else(|| EXTRA_PRICES.iter().find(|(c, ..)| *c == stock_code).map(|(.., p)| *p))
            .unwrap_or(DEFAULT_PRICE))
    }

    fn all_stock_codes(&self) -> Vec<String> {
        SCENARIOS.iter().map(|s| s.code.to_string()).collect()
    }

    /// Closes alternating between the price and a bump proportional to the
    /// forecast trend, ending on the current price. RSI sits at 50.
    fn closes(&self, stock_code: &str) -> Vec<f64> {
        let price = self.current_price(stock_code).unwrap_or(DEFAULT_PRICE);
        let bump = 0.01 + scenario(stock_code).map(|s| s.trend.abs()).unwrap_or(0.0);
        (0..MOCK_HISTORY)
            .map(|i| {
                if (MOCK_HISTORY - 1 - i) % 2 == 0 {
                    price
                } else {
                    price * (1.0 + bump)
                }
            })
            .collect()
    }

    fn liquid_stock_codes(&self, _min_avg_volume: f64, _min_days: usize) -> Vec<String> {
        self.all_stock_codes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_scenarios() {
        let mocks = MockProviders::new();
        let forecast = mocks.forecast("TN0001600154").await.unwrap();
        assert_eq!(forecast.trend, 0.032);
        assert_eq!(forecast.predictions.len(), 5);

        let sentiment = mocks.sentiment("TN0003800200").await.unwrap();
        assert_eq!(sentiment.score, -0.45);

        let anomaly = mocks.anomalies("TN0001900604").await.unwrap();
        assert!(anomaly.volume_spike && anomaly.price_spike && anomaly.any_anomaly);
        assert_eq!(mocks.current_price("TN0001800457").unwrap(), 93.90);
        assert_eq!(mocks.stock_name("TN0004900255"), "UIB");
    }

    #[tokio::test]
    async fn test_unknown_code_is_neutral() {
        let mocks = MockProviders::new();
        assert_eq!(mocks.forecast("XX").await.unwrap().trend, 0.0);
        assert_eq!(mocks.sentiment("XX").await.unwrap().num_articles, 0);
        assert!(!mocks.anomalies("XX").await.unwrap().any_anomaly);
        assert_eq!(mocks.current_price("XX").unwrap(), DEFAULT_PRICE);
        assert_eq!(mocks.stock_name("XX"), "XX");
    }

    #[test]
    fn test_synthetic_history_is_neutral() {
        let mocks = MockProviders::new();
        let closes = mocks.closes("TN0001100254");
        assert_eq!(closes.len(), MOCK_HISTORY);
        assert_eq!(*closes.last().unwrap(), 11.53);

        let signal = technical_analysis::technical_signal(&closes).unwrap();
        assert!((signal.rsi.unwrap() - 50.0).abs() < 1e-6);
        assert!(signal.macd.is_none());
        assert!(mocks.volatility("TN0001100254", 30).unwrap() > mocks.volatility("TN0001800853", 30).unwrap());
    }
}
