use std::sync::Arc;

use analysis_core::adaptive::round_to;
use analysis_core::{
    Action, AnalysisError, AnomalyProvider, ForecastProvider, MarketData, MemoryEvidence, MemoryProvider,
    Recommendation, RiskLevel, RiskProfile, SentimentProvider, SignalBundle,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::DecisionConfig;
use crate::explainer;
use crate::mocks::MockProviders;
use crate::scoring;

const MAX_SUMMARY_PICKS: usize = 5;
const MAX_SUMMARY_ALERTS: usize = 10;
const STRONG_CONFIDENCE: f64 = 0.8;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Which actions `get_top_recommendations` keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationFilter {
    Buy,
    Sell,
    #[default]
    All,
}

impl RecommendationFilter {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "buy" => RecommendationFilter::Buy,
            "sell" => RecommendationFilter::Sell,
            _ => RecommendationFilter::All,
        }
    }

    fn keeps(&self, action: Action) -> bool {
        match self {
            RecommendationFilter::Buy => action == Action::Buy,
            RecommendationFilter::Sell => action == Action::Sell,
            RecommendationFilter::All => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    /// HAUSSIER, BAISSIER or NEUTRE
    pub overall_sentiment: String,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub hold_signals: usize,
    pub total_analyzed: usize,
    pub top_buys: Vec<Recommendation>,
    pub top_sells: Vec<Recommendation>,
    pub alerts: Vec<String>,
    pub user_profile: RiskProfile,
    pub timestamp: DateTime<Utc>,
}

fn keep_signal<T>(label: &str, stock_code: &str, result: Result<T, AnalysisError>, errors: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{} signal unavailable for {}: {}", label, stock_code, e);
            errors.push(format!("{}: {}", label, e));
            None
        }
    }
}

/// Combines the forecast, sentiment, anomaly and technical signals of a
/// stock into a recommendation.
pub struct DecisionEngine {
    market: Arc<dyn MarketData>,
    forecast: Arc<dyn ForecastProvider>,
    sentiment: Arc<dyn SentimentProvider>,
    anomaly: Arc<dyn AnomalyProvider>,
    memory: Option<Arc<dyn MemoryProvider>>,
    config: DecisionConfig,
    /// Cache per (stock, profile)
    cache: DashMap<(String, RiskProfile), CacheEntry<Recommendation>>,
}

impl DecisionEngine {
    pub fn new(
        market: Arc<dyn MarketData>,
        forecast: Arc<dyn ForecastProvider>,
        sentiment: Arc<dyn SentimentProvider>,
        anomaly: Arc<dyn AnomalyProvider>,
    ) -> Self {
        Self {
            market,
            forecast,
            sentiment,
            anomaly,
            memory: None,
            config: DecisionConfig::default(),
            cache: DashMap::new(),
        }
    }

    /// Engine wired to the deterministic demo providers.
    pub fn with_mocks() -> Self {
        let mocks = Arc::new(MockProviders::new());
        tracing::info!("Decision engine running on mock providers");
        Self::new(mocks.clone(), mocks.clone(), mocks.clone(), mocks)
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryProvider>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_config(mut self, config: DecisionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    pub fn market(&self) -> &Arc<dyn MarketData> {
        &self.market
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn cached(&self, key: &(String, RiskProfile)) -> Option<Recommendation> {
        let entry = self.cache.get(key)?;
        let age = Utc::now() - entry.cached_at;
        if age < Duration::seconds(self.config.cache_ttl_secs) {
            tracing::debug!("Recommendation cache hit for {} ({})", key.0, key.1.as_str());
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// Collect every signal. Failures are logged and leave the signal empty.
    async fn gather(&self, stock_code: &str, stock_name: &str) -> (SignalBundle, Option<MemoryEvidence>, Vec<String>) {
        let memory_lookup = async {
            match &self.memory {
                Some(memory) => Some(memory.evidence(stock_code, stock_name).await),
                None => None,
            }
        };

        let (forecast, sentiment, anomaly, memory) = tokio::join!(
            self.forecast.forecast(stock_code),
            self.sentiment.sentiment(stock_code),
            self.anomaly.anomalies(stock_code),
            memory_lookup,
        );

        let mut errors = Vec::new();
        let bundle = SignalBundle {
            forecast: keep_signal("forecast", stock_code, forecast, &mut errors),
            sentiment: keep_signal("sentiment", stock_code, sentiment, &mut errors),
            anomaly: keep_signal("anomaly", stock_code, anomaly, &mut errors),
            technical: technical_analysis::technical_signal(&self.market.closes(stock_code)),
        };

        let memory = match memory {
            Some(Ok(evidence)) => Some(evidence),
            Some(Err(e)) => {
                tracing::debug!("Market memory offline for {}: {}", stock_code, e);
                None
            }
            None => None,
        };

        (bundle, memory, errors)
    }

    /// Recommendation for one stock under one risk profile.
    pub async fn make_recommendation(&self, stock_code: &str, profile: RiskProfile) -> Result<Recommendation, AnalysisError> {
        let key = (stock_code.to_string(), profile);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let current_price = self.market.current_price(stock_code)?;
        let stock_name = self.market.stock_name(stock_code);

        let (signals, memory, errors) = self.gather(stock_code, &stock_name).await;
        let eval = scoring::evaluate(&signals, profile, &self.config);
        let signal_notes = explainer::signal_notes(&signals, memory.as_ref());
        let suggested_action = explainer::suggested_action(eval.action, &stock_name, current_price, eval.confidence, profile);

        let mut rec = Recommendation {
            stock_code: stock_code.to_string(),
            stock_name,
            current_price,
            action: eval.action,
            confidence: eval.confidence,
            score: round_to(eval.score, 2),
            raw_score: round_to(eval.raw_score, 2),
            strong_signal: eval.strong_signal,
            signals,
            signal_notes,
            memory,
            risk_level: eval.risk_level,
            suggested_action,
            user_profile: profile,
            explanation: String::new(),
            short_explanation: String::new(),
            error: (!errors.is_empty()).then(|| errors.join("; ")),
            timestamp: Utc::now(),
        };
        rec.explanation = explainer::explain_fr(&rec);
        rec.short_explanation = explainer::short_explanation(&rec);

        tracing::info!(
            "{} {} score={:.2} confidence={:.2} ({})",
            rec.action.as_str(),
            stock_code,
            rec.score,
            rec.confidence,
            profile.as_str()
        );

        self.cache.insert(
            key,
            CacheEntry {
                data: rec.clone(),
                cached_at: Utc::now(),
            },
        );
        Ok(rec)
    }

    async fn recommend_all(&self, codes: &[String], profile: RiskProfile) -> Vec<Result<Recommendation, AnalysisError>> {
        join_all(codes.iter().map(|code| self.make_recommendation(code, profile))).await
    }

    /// Strongest signals across the universe, by |score|.
    pub async fn get_top_recommendations(
        &self,
        n: usize,
        profile: RiskProfile,
        filter: RecommendationFilter,
    ) -> Vec<Recommendation> {
        let codes = self.market.all_stock_codes();
        let mut recs: Vec<Recommendation> = self
            .recommend_all(&codes, profile)
            .await
            .into_iter()
            .zip(&codes)
            .filter_map(|(result, code)| match result {
                Ok(rec) => Some(rec),
                Err(e) => {
                    tracing::warn!("Error analyzing {}: {}", code, e);
                    None
                }
            })
            .filter(|rec| filter.keeps(rec.action))
            .collect();

        recs.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs()));
        recs.truncate(n);
        recs
    }

    /// One recommendation per held stock; failures become a zero-confidence HOLD.
    pub async fn analyze_portfolio_stocks(&self, codes: &[String], profile: RiskProfile) -> Vec<Recommendation> {
        self.recommend_all(codes, profile)
            .await
            .into_iter()
            .zip(codes)
            .map(|(result, code)| match result {
                Ok(rec) => rec,
                Err(e) => self.failed_recommendation(code, profile, &e),
            })
            .collect()
    }

    fn failed_recommendation(&self, stock_code: &str, profile: RiskProfile, err: &AnalysisError) -> Recommendation {
        let stock_name = self.market.stock_name(stock_code);
        Recommendation {
            stock_code: stock_code.to_string(),
            current_price: 0.0,
            action: Action::Hold,
            confidence: 0.0,
            score: 0.0,
            raw_score: 0.0,
            strong_signal: false,
            signals: SignalBundle::default(),
            signal_notes: Vec::new(),
            memory: None,
            risk_level: RiskLevel::Medium,
            suggested_action: explainer::suggested_action(Action::Hold, &stock_name, 0.0, 0.0, profile),
            user_profile: profile,
            explanation: explainer::ANALYSIS_ERROR_TEXT.to_string(),
            short_explanation: explainer::ANALYSIS_ERROR_TEXT.to_string(),
            stock_name,
            error: Some(err.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub async fn get_market_summary(&self, profile: RiskProfile) -> MarketSummary {
        let codes = self.market.all_stock_codes();
        let recs: Vec<Recommendation> = self
            .recommend_all(&codes, profile)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect();

        let count = |action: Action| recs.iter().filter(|r| r.action == action).count();
        let (buys, sells, holds) = (count(Action::Buy), count(Action::Sell), count(Action::Hold));

        let overall = if buys as f64 > sells as f64 * 1.5 {
            "HAUSSIER"
        } else if sells as f64 > buys as f64 * 1.5 {
            "BAISSIER"
        } else {
            "NEUTRE"
        };

        let mut top_buys: Vec<Recommendation> = recs.iter().filter(|r| r.action == Action::Buy).cloned().collect();
        top_buys.sort_by(|a, b| b.score.total_cmp(&a.score));
        top_buys.truncate(MAX_SUMMARY_PICKS);

        let mut top_sells: Vec<Recommendation> = recs.iter().filter(|r| r.action == Action::Sell).cloned().collect();
        top_sells.sort_by(|a, b| a.score.total_cmp(&b.score));
        top_sells.truncate(MAX_SUMMARY_PICKS);

        let mut alerts = Vec::new();
        for rec in &recs {
            if rec.signals.anomaly.as_ref().is_some_and(|a| a.any_anomaly) {
                alerts.push(format!("Anomalie detectee sur {}", rec.stock_name));
            }
            if rec.confidence >= STRONG_CONFIDENCE {
                alerts.push(format!("Signal fort: {} {}", rec.action.as_str(), rec.stock_name));
            }
        }
        alerts.truncate(MAX_SUMMARY_ALERTS);

        MarketSummary {
            overall_sentiment: overall.to_string(),
            buy_signals: buys,
            sell_signals: sells,
            hold_signals: holds,
            total_analyzed: recs.len(),
            top_buys,
            top_sells,
            alerts,
            user_profile: profile,
            timestamp: Utc::now(),
        }
    }
}
