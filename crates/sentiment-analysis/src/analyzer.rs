use analysis_core::adaptive::{mean, population_std, round_to};
use analysis_core::{AnalysisError, SentimentProvider, SentimentSignal};
use async_trait::async_trait;
use futures_util::future::join_all;
use ml_client::{LlmSentimentClient, MLClient, SentimentClient};
use serde::{Deserialize, Serialize};

use crate::keywords::{self, correct_with_keywords, keyword_verdict, HeadlineClass, Verdict};
use crate::news::NewsCache;

pub const NO_NEWS_SUMMARY: &str = "Aucune actualité disponible pour cette valeur.";
const TOP_HEADLINES: usize = 5;
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Which scorer to use for headlines. `Auto` walks llm, ml, keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentMethod {
    Auto,
    Llm,
    Ml,
    Keywords,
}

impl SentimentMethod {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "llm" | "groq" => SentimentMethod::Llm,
            "ml" | "huggingface" => SentimentMethod::Ml,
            "keywords" => SentimentMethod::Keywords,
            _ => SentimentMethod::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSentiment {
    pub headline: String,
    pub source: String,
    pub date: String,
    pub sentiment: HeadlineClass,
    pub score: f64,
    pub confidence: f64,
    /// "llm", "ml", "keywords" or "keywords_fallback"
    pub method: String,
    pub correction_applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSentiment {
    pub stock_code: String,
    pub stock_name: String,
    pub sentiment_score: f64,
    pub confidence: f64,
    pub num_articles: usize,
    pub sample_headlines: Vec<HeadlineSentiment>,
    pub summary: String,
    pub method: String,
    pub correction_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub overall_sentiment: f64,
    pub num_stocks: usize,
    pub positive_stocks: usize,
    pub negative_stocks: usize,
    pub neutral_stocks: usize,
}

pub struct SentimentAnalyzer {
    cache: NewsCache,
    method: SentimentMethod,
    llm: Option<LlmSentimentClient>,
    ml: Option<SentimentClient>,
}

impl SentimentAnalyzer {
    /// Keyword-only analyzer over a news cache.
    pub fn new(cache: NewsCache) -> Self {
        Self {
            cache,
            method: SentimentMethod::Keywords,
            llm: None,
            ml: None,
        }
    }

    /// Enable the remote scorers. The LLM is only used when an API key is configured.
    pub fn with_ml(mut self, client: &MLClient, method: SentimentMethod) -> Self {
        self.llm = client.llm.clone();
        self.ml = Some(client.sentiment.clone());
        self.method = method;
        tracing::info!(
            "Sentiment analyzer using {:?} (llm configured: {})",
            method,
            self.llm.is_some()
        );
        self
    }

    pub fn method(&self) -> SentimentMethod {
        self.method
    }

    pub fn cache(&self) -> &NewsCache {
        &self.cache
    }

    pub fn stock_name(&self, stock_code: &str) -> String {
        self.cache
            .get(stock_code)
            .and_then(|n| n.stock_name.clone())
            .or_else(|| data_loader::known_stock_name(stock_code).map(str::to_string))
            .unwrap_or_else(|| stock_code.to_string())
    }

    async fn try_llm(&self, text: &str) -> Option<Result<Verdict, String>> {
        let llm = self.llm.as_ref()?;
        Some(
            llm.score(text)
                .await
                .map(|p| Verdict::new(&p.label, p.score, p.confidence))
                .map_err(|e| e.to_string()),
        )
    }

    async fn try_ml(&self, text: &str) -> Option<Result<Verdict, String>> {
        let ml = self.ml.as_ref()?;
        let result = ml.classify(vec![text.to_string()]).await.map_err(|e| e.to_string());
        Some(result.and_then(|response| {
            response
                .predictions
                .into_iter()
                .next()
                .map(|p| Verdict::new(&p.label, p.score, p.confidence))
                .ok_or_else(|| "empty prediction".to_string())
        }))
    }

    /// Score one headline through the configured chain, with the financial
    /// keyword correction applied to remote verdicts.
    pub async fn score_headline(&self, text: &str) -> (Verdict, &'static str) {
        let mut remote_failed = false;

        if matches!(self.method, SentimentMethod::Auto | SentimentMethod::Llm) {
            match self.try_llm(text).await {
                Some(Ok(verdict)) => return (correct_with_keywords(verdict, text), "llm"),
                Some(Err(e)) => {
                    tracing::debug!("LLM sentiment failed, falling back: {}", e);
                    remote_failed = true;
                }
                None => remote_failed |= self.method == SentimentMethod::Llm,
            }
        }

        if matches!(self.method, SentimentMethod::Auto | SentimentMethod::Ml) {
            match self.try_ml(text).await {
                Some(Ok(verdict)) => return (correct_with_keywords(verdict, text), "ml"),
                Some(Err(e)) => {
                    tracing::debug!("ML sentiment failed, falling back to keywords: {}", e);
                    remote_failed = true;
                }
                None => remote_failed |= self.method == SentimentMethod::Ml,
            }
        }

        if remote_failed {
            (keyword_verdict(text, FALLBACK_CONFIDENCE), "keywords_fallback")
        } else {
            let confidence = if keywords::analyze_text(text) == 0.0 { 0.3 } else { 0.6 };
            (keyword_verdict(text, confidence), "keywords")
        }
    }

    pub async fn get_sentiment_score(&self, stock_code: &str) -> StockSentiment {
        let stock_name = self.stock_name(stock_code);
        let articles = self
            .cache
            .get(stock_code)
            .map(|n| n.articles.as_slice())
            .unwrap_or_default();

        let scored: Vec<_> = articles.iter().filter(|a| !a.headline.trim().is_empty()).collect();
        if scored.is_empty() {
            return StockSentiment {
                stock_code: stock_code.to_string(),
                stock_name,
                sentiment_score: 0.0,
                confidence: 0.0,
                num_articles: 0,
                sample_headlines: Vec::new(),
                summary: NO_NEWS_SUMMARY.to_string(),
                method: "keywords".to_string(),
                correction_applied: false,
            };
        }

        let verdicts = join_all(scored.iter().map(|a| self.score_headline(&a.headline))).await;

        let mut headlines: Vec<HeadlineSentiment> = scored
            .iter()
            .zip(verdicts)
            .map(|(article, (verdict, method))| HeadlineSentiment {
                headline: article.headline.clone(),
                source: article.source.clone(),
                date: article.date.clone(),
                sentiment: HeadlineClass::from_score(verdict.score),
                score: verdict.score,
                confidence: verdict.confidence,
                method: method.to_string(),
                correction_applied: verdict.correction_applied,
            })
            .collect();

        let scores: Vec<f64> = headlines.iter().map(|h| h.score).collect();
        let avg = mean(&scores).clamp(-1.0, 1.0);
        let volume_confidence = (scores.len() as f64 / 10.0).min(0.8);
        let agreement_confidence = (1.0 - population_std(&scores)).max(0.5);

        let method = if headlines.iter().any(|h| h.method == "keywords_fallback") {
            "keywords_fallback".to_string()
        } else {
            headlines[0].method.clone()
        };
        let correction_applied = headlines.iter().any(|h| h.correction_applied);

        headlines.sort_by(|a, b| b.date.cmp(&a.date));
        headlines.truncate(TOP_HEADLINES);

        StockSentiment {
            stock_code: stock_code.to_string(),
            stock_name,
            sentiment_score: round_to(avg, 4),
            confidence: round_to((volume_confidence + agreement_confidence) / 2.0, 4),
            num_articles: articles.len(),
            sample_headlines: headlines,
            summary: summarize(avg),
            method,
            correction_applied,
        }
    }

    /// Average sentiment over every stock in the news cache.
    pub async fn get_market_sentiment(&self) -> MarketSentiment {
        let codes = self.cache.stock_codes();
        let results = join_all(codes.iter().map(|c| self.get_sentiment_score(c))).await;

        let scores: Vec<f64> = results.iter().map(|r| r.sentiment_score).collect();
        MarketSentiment {
            overall_sentiment: round_to(mean(&scores).clamp(-1.0, 1.0), 4),
            num_stocks: scores.len(),
            positive_stocks: scores.iter().filter(|s| **s > 0.2).count(),
            negative_stocks: scores.iter().filter(|s| **s < -0.2).count(),
            neutral_stocks: scores.iter().filter(|s| (-0.2..=0.2).contains(*s)).count(),
        }
    }
}

pub fn summarize(score: f64) -> String {
    if score > 0.3 {
        format!("Sentiment global très positif ({:.2}). Les actualités montrent des perspectives favorables.", score)
    } else if score > 0.1 {
        format!("Sentiment légèrement positif ({:.2}). Les nouvelles sont plutôt encourageantes.", score)
    } else if score < -0.3 {
        format!("Sentiment négatif ({:.2}). Les actualités révèlent des préoccupations.", score)
    } else if score < -0.1 {
        format!("Sentiment légèrement négatif ({:.2}). Certaines inquiétudes sont présentes.", score)
    } else {
        format!("Sentiment neutre ({:.2}). Les actualités sont équilibrées.", score)
    }
}

#[async_trait]
impl SentimentProvider for SentimentAnalyzer {
    async fn sentiment(&self, stock_code: &str) -> Result<SentimentSignal, AnalysisError> {
        let result = self.get_sentiment_score(stock_code).await;
        Ok(SentimentSignal {
            score: result.sentiment_score,
            num_articles: result.num_articles,
            sample_headlines: result
                .sample_headlines
                .iter()
                .take(3)
                .map(|h| h.headline.clone())
                .collect(),
            method: result.method,
            correction_applied: result.correction_applied,
        })
    }
}
