//! Decision engine: turns the forecast, sentiment, anomaly and technical
//! signals of a BVMT stock into a BUY/SELL/HOLD recommendation with a
//! French explanation.

pub mod allocation;
pub mod config;
pub mod engine;
pub mod explainer;
pub mod mocks;
pub mod scoring;


pub use allocation::{split_by_volatility, AllocationKind, AllocationSuggestion, AllocationTemplate};
pub use config::{DecisionConfig, ProfileTable, SignalWeights, CACHE_TTL_SECS, CONFIDENCE_CAP};
pub use engine::{DecisionEngine, MarketSummary, RecommendationFilter};
pub use explainer::{alert_message, explain_en, explain_fr, render_signals_table, short_explanation, signals_table, SignalRow};
pub use mocks::MockProviders;
pub use scoring::{evaluate, Components, Evaluation};
