//! Session portfolio: valuation, trading and reset.

use std::collections::BTreeMap;

use analysis_core::MarketData;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use portfolio_manager::{PerformanceMetrics, Portfolio, PositionDetail, PriceMap, Transaction, DEFAULT_NAME};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct TradeRequest {
    #[serde(default)]
    pub stock_code: String,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub initial_capital: Option<f64>,
}

#[derive(Deserialize)]
pub struct TransactionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Serialize)]
pub struct PortfolioView {
    pub metrics: PerformanceMetrics,
    pub allocation: BTreeMap<String, f64>,
}

#[derive(Serialize)]
pub struct TradeResult {
    pub message: String,
    pub transaction: Transaction,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/portfolio/positions", get(get_positions))
        .route("/api/portfolio/transactions", get(get_transactions))
        .route("/api/portfolio/buy", post(buy))
        .route("/api/portfolio/sell", post(sell))
        .route("/api/portfolio/reset", post(reset))
}

/// Quote a price at the exchange's millime precision.
fn quote(market: &dyn MarketData, code: &str) -> Result<Decimal, AppError> {
    let price = market.current_price(code).map_err(AppError::analysis)?;
    Decimal::from_f64(price)
        .map(|p| p.round_dp(3))
        .ok_or_else(|| AppError::bad_request(format!("No usable price for {}", code)))
}

/// Current prices of every held stock. Stocks without a quote are valued
/// at their average cost.
fn held_prices(market: &dyn MarketData, portfolio: &Portfolio) -> PriceMap {
    portfolio
        .holdings()
        .keys()
        .filter_map(|code| {
            market
                .current_price(code)
                .ok()
                .and_then(Decimal::from_f64)
                .map(|p| (code.clone(), p.round_dp(3)))
        })
        .collect()
}

fn validate_trade(req: &TradeRequest) -> Result<(String, u64), AppError> {
    let code = req.stock_code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::bad_request("stock_code is required"));
    }
    if req.quantity <= 0 {
        return Err(AppError::bad_request("quantity must be positive"));
    }
    Ok((code, req.quantity as u64))
}

async fn get_portfolio(State(state): State<AppState>) -> Json<ApiResponse<PortfolioView>> {
    let portfolio = state.portfolio.read().await;
    let prices = held_prices(state.engine.market().as_ref(), &portfolio);
    Json(ApiResponse::success(PortfolioView {
        metrics: portfolio.performance_metrics(&prices),
        allocation: portfolio.allocation(&prices),
    }))
}

async fn get_positions(State(state): State<AppState>) -> Json<ApiResponse<Vec<PositionDetail>>> {
    let portfolio = state.portfolio.read().await;
    let prices = held_prices(state.engine.market().as_ref(), &portfolio);
    Json(ApiResponse::success(portfolio.position_details(&prices)))
}

async fn get_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Json<ApiResponse<Vec<Transaction>>> {
    let portfolio = state.portfolio.read().await;
    Json(ApiResponse::success(portfolio.transaction_history(Some(query.limit), None)))
}

async fn buy(
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<ApiResponse<TradeResult>>, AppError> {
    let (code, quantity) = validate_trade(&req)?;
    let market = state.engine.market();
    let price = quote(market.as_ref(), &code)?;
    let name = market.stock_name(&code);

    let mut portfolio = state.portfolio.write().await;
    let transaction = portfolio
        .buy(&code, &name, quantity, price, Utc::now().date_naive())
        .map_err(AppError::portfolio)?;
    tracing::info!("Bought {} {} at {} TND", quantity, code, price);

    Ok(Json(ApiResponse::success(TradeResult {
        message: format!(
            "Achat reussi: {} x {} a {} TND (total {} TND)",
            quantity, name, price, transaction.total
        ),
        transaction,
    })))
}

async fn sell(
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> Result<Json<ApiResponse<TradeResult>>, AppError> {
    let (code, quantity) = validate_trade(&req)?;
    let price = quote(state.engine.market().as_ref(), &code)?;

    let mut portfolio = state.portfolio.write().await;
    let transaction = portfolio
        .sell(&code, quantity, price, Utc::now().date_naive())
        .map_err(AppError::portfolio)?;
    let profit_loss = transaction.profit_loss.unwrap_or_default();
    tracing::info!("Sold {} {} at {} TND (P/L {})", quantity, code, price, profit_loss);

    Ok(Json(ApiResponse::success(TradeResult {
        message: format!(
            "Vente reussie: {} x {} a {} TND (P/L: {:+} TND)",
            quantity,
            transaction.stock_name,
            price,
            profit_loss.round_dp(2)
        ),
        transaction,
    })))
}

async fn reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<ApiResponse<PerformanceMetrics>>, AppError> {
    let capital = match req.initial_capital {
        Some(value) => Decimal::from_f64(value)
            .filter(|c| *c > Decimal::ZERO)
            .ok_or_else(|| AppError::bad_request("initial_capital must be positive"))?,
        None => state.config.initial_capital,
    };

    let mut portfolio = state.portfolio.write().await;
    let profile = portfolio.profile();
    *portfolio = Portfolio::new(DEFAULT_NAME, capital, profile);
    tracing::info!("Portfolio reset with {} TND", capital);

    Ok(Json(ApiResponse::success(portfolio.performance_metrics(&PriceMap::new()))))
}
