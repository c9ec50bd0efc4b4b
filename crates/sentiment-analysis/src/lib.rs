//! French financial news sentiment: keyword lexicons, the optional
//! LLM and classifier services, and per-stock and market aggregation.

pub mod analyzer;
pub mod keywords;
pub mod news;


pub use analyzer::{
    summarize, HeadlineSentiment, MarketSentiment, SentimentAnalyzer, SentimentMethod,
    StockSentiment, NO_NEWS_SUMMARY,
};
pub use keywords::{analyze_text, classify_headline, HeadlineClass, Verdict};
pub use news::{Article, NewsCache, StockNews};
