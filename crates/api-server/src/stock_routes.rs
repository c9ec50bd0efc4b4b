//! Stock data, recommendation and market-wide routes.

use analysis_core::{Recommendation, RiskProfile};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use data_loader::StockSummary;
use decision_engine::{
    alert_message, explain_en, signals_table, AllocationSuggestion, MarketSummary, RecommendationFilter, SignalRow,
};
use forecasting::TrendAnalysis;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct ProfileQuery {
    pub profile: Option<String>,
}

impl ProfileQuery {
    fn profile(&self) -> RiskProfile {
        self.profile.as_deref().map(RiskProfile::parse).unwrap_or_default()
    }
}

#[derive(Deserialize)]
pub struct TopQuery {
    #[serde(default = "default_top_n")]
    pub n: usize,
    pub profile: Option<String>,
}

fn default_top_n() -> usize {
    5
}

#[derive(Deserialize)]
pub struct AllocationQuery {
    pub profile: Option<String>,
    #[serde(default = "default_capital")]
    pub capital: f64,
}

fn default_capital() -> f64 {
    10_000.0
}

#[derive(Serialize)]
pub struct StockListing {
    pub code: String,
    pub name: String,
    pub price: Option<f64>,
}

#[derive(Serialize)]
pub struct StockDetail {
    pub code: String,
    pub name: String,
    pub price: f64,
    pub summary: Option<StockSummary>,
    pub trend: Option<TrendAnalysis>,
}

/// A recommendation plus the views a client renders next to it
#[derive(Serialize)]
pub struct RecommendationView {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub alert: Option<String>,
    pub signals_table: Vec<SignalRow>,
    pub explanation_en: String,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/stocks", get(list_stocks))
        .route("/api/stock/:code", get(get_stock))
        .route("/api/recommend/:code", get(recommend))
        .route("/api/market/summary", get(market_summary))
        .route("/api/market/top-buys", get(top_buys))
        .route("/api/market/top-sells", get(top_sells))
        .route("/api/market/allocation", get(allocation))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "name": "BVMT Trading Assistant API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /api/health",
            "GET /api/stocks",
            "GET /api/stock/:code",
            "GET /api/recommend/:code?profile=",
            "GET /api/market/summary?profile=",
            "GET /api/market/top-buys?n=5&profile=",
            "GET /api/market/top-sells?n=5&profile=",
            "GET /api/market/allocation?profile=&capital=",
            "GET /api/portfolio",
            "GET /api/portfolio/positions",
            "GET /api/portfolio/transactions?limit=20",
            "POST /api/portfolio/buy",
            "POST /api/portfolio/sell",
            "POST /api/portfolio/reset",
            "GET /api/forecast/:code?days=5",
            "GET /api/sentiment/:code",
            "GET /api/sentiment/market",
            "GET /api/anomalies/:code?lookback=30",
            "GET /api/alerts?days=7",
            "POST /api/alerts/:id/action",
        ],
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "module": "decision-engine",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_stocks(State(state): State<AppState>) -> Json<ApiResponse<Vec<StockListing>>> {
    let market = state.engine.market();
    let stocks = market
        .all_stock_codes()
        .into_iter()
        .map(|code| StockListing {
            name: market.stock_name(&code),
            price: market.current_price(&code).ok(),
            code,
        })
        .collect();
    Json(ApiResponse::success(stocks))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<StockDetail>>, AppError> {
    let code = code.trim().to_uppercase();
    let market = state.engine.market();
    let price = market.current_price(&code).map_err(AppError::analysis)?;

    // mock mode has no session history behind the prices
    let summary = state.store.get_stock_summary(&code).ok();
    let trend = state.forecaster.get_trend_analysis(&code).ok();

    Ok(Json(ApiResponse::success(StockDetail {
        name: market.stock_name(&code),
        code,
        price,
        summary,
        trend,
    })))
}

async fn recommend(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ApiResponse<RecommendationView>>, AppError> {
    let code = code.trim().to_uppercase();
    let recommendation = state
        .engine
        .make_recommendation(&code, query.profile())
        .await
        .map_err(AppError::analysis)?;

    let view = RecommendationView {
        alert: alert_message(&recommendation),
        signals_table: signals_table(&recommendation.signals, &state.engine.config().weights),
        explanation_en: explain_en(&recommendation),
        recommendation,
    };
    Ok(Json(ApiResponse::success(view)))
}

async fn market_summary(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Json<ApiResponse<MarketSummary>> {
    Json(ApiResponse::success(state.engine.get_market_summary(query.profile()).await))
}

async fn top_by(state: &AppState, query: &TopQuery, filter: RecommendationFilter) -> Vec<Recommendation> {
    let profile = query.profile.as_deref().map(RiskProfile::parse).unwrap_or_default();
    state.engine.get_top_recommendations(query.n, profile, filter).await
}

async fn top_buys(State(state): State<AppState>, Query(query): Query<TopQuery>) -> Json<ApiResponse<Vec<Recommendation>>> {
    Json(ApiResponse::success(top_by(&state, &query, RecommendationFilter::Buy).await))
}

async fn top_sells(State(state): State<AppState>, Query(query): Query<TopQuery>) -> Json<ApiResponse<Vec<Recommendation>>> {
    Json(ApiResponse::success(top_by(&state, &query, RecommendationFilter::Sell).await))
}

async fn allocation(
    State(state): State<AppState>,
    Query(query): Query<AllocationQuery>,
) -> Result<Json<ApiResponse<Vec<AllocationSuggestion>>>, AppError> {
    let profile = query.profile.as_deref().map(RiskProfile::parse).unwrap_or_default();
    let suggestions = state
        .engine
        .suggest_diversified_portfolio(profile, query.capital)
        .await
        .map_err(AppError::analysis)?;
    Ok(Json(ApiResponse::success(suggestions)))
}
